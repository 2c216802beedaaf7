// 预约服务
// 名额检查、重复报名检查与名额增减在同一事务中完成

mod error;
mod reservation;
pub mod retry;

pub use error::ReservationError;
pub use reservation::ReservationService;
pub use retry::{RetryPolicy, retry_with_backoff};

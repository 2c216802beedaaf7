// 领域模型
// 参访场次与报名记录，存储层与接口层共用

pub mod registration;
pub mod session;

use thiserror::Error;

pub use registration::{
    DEFAULT_CANCEL_REASON, RegistrationDetails, RegistrationStatus, RegistrationWithSession,
    ValidatedDetails, VisitRegistration, cancel_reason_or_default,
};
pub use session::{NewSession, SessionStatus, VisitSession};

/// 输入校验失败，内容为面向用户的说明
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

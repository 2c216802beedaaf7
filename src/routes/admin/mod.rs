mod handler;
mod model;

pub use handler::{close_session, seed_sessions};
pub use model::{SeedSessionsRequest, SeedSessionsResponse};

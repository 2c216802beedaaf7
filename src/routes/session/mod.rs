mod handler;
mod model;

pub use handler::{get_session, list_sessions};
pub use model::SessionInfo;

use serde::{Deserialize, Serialize};

use crate::models::VisitSession;

/// 场次列表中的单个场次
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub date: String,
    pub time: String,
    pub remaining_seats: i32,
    pub total_seats: i32,
}

impl From<VisitSession> for SessionInfo {
    fn from(session: VisitSession) -> Self {
        Self {
            id: session.id,
            date: session.date,
            time: session.time,
            remaining_seats: session.remaining_seats,
            total_seats: session.total_seats,
        }
    }
}

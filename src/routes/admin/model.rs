use serde::{Deserialize, Serialize};

use crate::models::NewSession;

#[derive(Debug, Deserialize)]
pub struct SeedSessionsRequest {
    pub sessions: Vec<NewSession>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeedSessionsResponse {
    pub submitted: usize,
    pub inserted: u64,
}

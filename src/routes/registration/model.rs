use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{RegistrationDetails, RegistrationStatus, RegistrationWithSession};

#[derive(Debug, Deserialize)]
pub struct CreateRegistrationRequest {
    pub session_id: String,
    pub name: String,
    pub cellphone: String,
    pub visitors: Option<i32>,
    pub remark: Option<String>,
}

impl CreateRegistrationRequest {
    pub fn into_parts(self) -> (String, RegistrationDetails) {
        (
            self.session_id,
            RegistrationDetails {
                name: self.name,
                cellphone: self.cellphone,
                visitors: self.visitors,
                remark: self.remark,
            },
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRegistrationResponse {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRegistrationRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelRegistrationResponse {
    pub id: String,
    pub status: RegistrationStatus,
    pub cancel_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub date: String,
    pub time: String,
}

/// 我的报名列表中的一项
#[derive(Debug, Serialize, Deserialize)]
pub struct MyRegistration {
    pub id: String,
    pub session: SessionSummary,
    pub visitors: i32,
    pub name: String,
    pub cellphone: String,
    pub remark: Option<String>,
    pub status: RegistrationStatus,
    pub timestamp: DateTime<Utc>,
}

impl From<RegistrationWithSession> for MyRegistration {
    fn from(joined: RegistrationWithSession) -> Self {
        let RegistrationWithSession {
            registration,
            session,
        } = joined;
        Self {
            id: registration.id,
            session: SessionSummary {
                id: session.id,
                date: session.date,
                time: session.time,
            },
            visitors: registration.visitors,
            name: registration.name,
            cellphone: registration.cellphone,
            remark: registration.remark,
            status: registration.status,
            timestamp: registration.timestamp,
        }
    }
}

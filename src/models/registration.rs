use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::session::VisitSession;
use super::ValidationError;

/// 未填写取消原因时记录的默认值
pub const DEFAULT_CANCEL_REASON: &str = "未提供原因";

const MAX_VISITORS: i32 = 50;
const MAX_NAME_CHARS: usize = 50;
const MAX_CELLPHONE_CHARS: usize = 20;
const MAX_REMARK_CHARS: usize = 500;

/// 报名状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Confirmed,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Confirmed => "confirmed",
            RegistrationStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(RegistrationStatus::Confirmed),
            "cancelled" => Ok(RegistrationStatus::Cancelled),
            other => Err(format!("unknown registration status: {}", other)),
        }
    }
}

/// 参访报名记录，取消时只变更状态，不做物理删除
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitRegistration {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub name: String,
    pub cellphone: String,
    pub visitors: i32,
    pub remark: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status: RegistrationStatus,
    pub cancel_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl VisitRegistration {
    /// 以当前时间创建一笔已确认的报名
    pub fn confirmed(session_id: &str, user_id: &str, details: ValidatedDetails) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            name: details.name,
            cellphone: details.cellphone,
            visitors: details.visitors,
            remark: details.remark,
            timestamp: Utc::now(),
            status: RegistrationStatus::Confirmed,
            cancel_reason: None,
            cancelled_at: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == RegistrationStatus::Cancelled
    }

    pub fn cancel(&mut self, reason: String, at: DateTime<Utc>) {
        self.status = RegistrationStatus::Cancelled;
        self.cancel_reason = Some(reason);
        self.cancelled_at = Some(at);
    }
}

/// 报名记录连同所属场次的快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationWithSession {
    pub registration: VisitRegistration,
    pub session: VisitSession,
}

/// 报名时提交的资料
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationDetails {
    pub name: String,
    pub cellphone: String,
    pub visitors: Option<i32>,
    pub remark: Option<String>,
}

/// 校验并整理后的报名资料
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDetails {
    pub name: String,
    pub cellphone: String,
    pub visitors: i32,
    pub remark: Option<String>,
}

impl RegistrationDetails {
    pub fn validate(self) -> Result<ValidatedDetails, ValidationError> {
        let visitors = self.visitors.unwrap_or(1);
        if visitors < 1 {
            return Err(ValidationError("参访人数至少为 1 人".into()));
        }
        if visitors > MAX_VISITORS {
            return Err(ValidationError(format!(
                "参访人数不能超过 {} 人",
                MAX_VISITORS
            )));
        }

        let name = self.name.trim().to_string();
        if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
            return Err(ValidationError(format!(
                "姓名不能为空且不超过 {} 个字",
                MAX_NAME_CHARS
            )));
        }

        let cellphone = self.cellphone.trim().to_string();
        if cellphone.is_empty() || cellphone.chars().count() > MAX_CELLPHONE_CHARS {
            return Err(ValidationError("请填写有效的手机号码".into()));
        }
        if !cellphone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
        {
            return Err(ValidationError("手机号码格式无效".into()));
        }

        let remark = self
            .remark
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if remark
            .as_ref()
            .is_some_and(|r| r.chars().count() > MAX_REMARK_CHARS)
        {
            return Err(ValidationError(format!(
                "备注不能超过 {} 个字",
                MAX_REMARK_CHARS
            )));
        }

        Ok(ValidatedDetails {
            name,
            cellphone,
            visitors,
            remark,
        })
    }
}

/// 整理取消原因，空白时使用默认原因
pub fn cancel_reason_or_default(reason: Option<&str>) -> String {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_CANCEL_REASON)
        .to_string()
}

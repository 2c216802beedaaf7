use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// 场次状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// 开放报名
    Open,
    /// 已关闭，不再接受报名
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(SessionStatus::Open),
            "closed" => Ok(SessionStatus::Closed),
            other => Err(format!("unknown session status: {}", other)),
        }
    }
}

/// 参访场次
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitSession {
    pub id: String,
    /// 日期标签，例如 "2025-05-01"
    pub date: String,
    /// 时段显示文字，例如 "10:00-12:00"
    pub time: String,
    pub total_seats: i32,
    /// 0 <= remaining_seats <= total_seats
    pub remaining_seats: i32,
    pub order: i32,
    pub status: SessionStatus,
}

impl VisitSession {
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// 按 delta 调整剩余名额，增加时不超过总名额。
    /// 结果为负时返回 `None`，调用方据此判定名额不足。
    pub fn seats_after(&self, delta: i32) -> Option<i32> {
        let next = self.remaining_seats.checked_add(delta)?;
        if next < 0 {
            return None;
        }
        Some(next.min(self.total_seats))
    }
}

/// 管理员初始化场次时提交的数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub id: String,
    pub date: String,
    pub time: String,
    pub total_seats: i32,
    #[serde(default)]
    pub order: i32,
}

impl NewSession {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError("场次 ID 不能为空".into()));
        }
        if self.date.trim().is_empty() || self.time.trim().is_empty() {
            return Err(ValidationError(format!(
                "场次 {} 缺少日期或时段",
                self.id
            )));
        }
        if self.total_seats <= 0 {
            return Err(ValidationError(format!(
                "场次 {} 的总名额必须大于 0",
                self.id
            )));
        }
        Ok(())
    }

    pub fn into_session(self) -> VisitSession {
        VisitSession {
            id: self.id.trim().to_string(),
            date: self.date,
            time: self.time,
            total_seats: self.total_seats,
            remaining_seats: self.total_seats,
            order: self.order,
            status: SessionStatus::Open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(total: i32, remaining: i32) -> VisitSession {
        VisitSession {
            id: "S1".into(),
            date: "2025-05-01".into(),
            time: "10:00-12:00".into(),
            total_seats: total,
            remaining_seats: remaining,
            order: 1,
            status: SessionStatus::Open,
        }
    }

    #[test]
    fn seats_after_rejects_negative_result() {
        assert_eq!(session(20, 2).seats_after(-3), None);
        assert_eq!(session(20, 3).seats_after(-3), Some(0));
    }

    #[test]
    fn seats_after_clamps_to_total() {
        assert_eq!(session(20, 19).seats_after(5), Some(20));
    }

    #[test]
    fn new_session_starts_full_and_open() {
        let seed = NewSession {
            id: " S9 ".into(),
            date: "2025-06-01".into(),
            time: "14:00".into(),
            total_seats: 12,
            order: 2,
        };
        assert!(seed.validate().is_ok());
        let created = seed.into_session();
        assert_eq!(created.id, "S9");
        assert_eq!(created.remaining_seats, 12);
        assert!(created.is_open());
    }

    #[test]
    fn new_session_requires_positive_capacity() {
        let seed = NewSession {
            id: "S9".into(),
            date: "2025-06-01".into(),
            time: "14:00".into(),
            total_seats: 0,
            order: 0,
        };
        assert!(matches!(seed.validate(), Err(ValidationError(_))));
    }
}

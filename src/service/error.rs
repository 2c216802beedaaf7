use thiserror::Error;

use crate::models::ValidationError;
use crate::store::StoreError;

/// 预约服务的错误类型。每个变体都有稳定的错误码，供 HTTP 接口与 LINE 机器人映射。
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error("session {0} is closed")]
    SessionClosed(String),
    #[error("registration {0} not found")]
    RegistrationNotFound(String),
    #[error("capacity exceeded: requested {requested}, remaining {remaining}")]
    CapacityExceeded { requested: i32, remaining: i32 },
    #[error("user already registered for session {0}")]
    AlreadyRegistered(String),
    #[error("registration {0} is already cancelled")]
    AlreadyCancelled(String),
    #[error("registration {0} belongs to another user")]
    Unauthorized(String),
    /// 可重试的存储错误
    #[error("transient store error: {0}")]
    Transient(String),
    #[error("store error: {0}")]
    Store(String),
}

impl ReservationError {
    /// 机器可读的错误码
    pub fn code(&self) -> &'static str {
        match self {
            ReservationError::Validation(_) => "ValidationError",
            ReservationError::SessionNotFound(_) => "SessionNotFound",
            ReservationError::SessionClosed(_) => "SessionClosed",
            ReservationError::RegistrationNotFound(_) => "RegistrationNotFound",
            ReservationError::CapacityExceeded { .. } => "CapacityExceeded",
            ReservationError::AlreadyRegistered(_) => "AlreadyRegistered",
            ReservationError::AlreadyCancelled(_) => "AlreadyCancelled",
            ReservationError::Unauthorized(_) => "Unauthorized",
            ReservationError::Transient(_) => "TransientStoreError",
            ReservationError::Store(_) => "InternalError",
        }
    }

    /// 面向用户的提示文字
    pub fn user_message(&self) -> String {
        match self {
            ReservationError::Validation(msg) => msg.clone(),
            ReservationError::SessionNotFound(_) => "找不到该参访场次".to_string(),
            ReservationError::SessionClosed(_) => "该场次已截止报名".to_string(),
            ReservationError::RegistrationNotFound(_) => "找不到该报名记录".to_string(),
            ReservationError::CapacityExceeded {
                requested,
                remaining,
            } => format!(
                "名额不足：本场次剩余 {} 位，您申请了 {} 位",
                remaining, requested
            ),
            ReservationError::AlreadyRegistered(_) => {
                "您已报名过此场次，请勿重复报名".to_string()
            }
            ReservationError::AlreadyCancelled(_) => "此报名已经取消".to_string(),
            ReservationError::Unauthorized(_) => "您只能取消自己的报名".to_string(),
            ReservationError::Transient(_) => "系统忙碌中，请稍后再试".to_string(),
            ReservationError::Store(_) => "内部服务器错误".to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ReservationError::Transient(_))
    }
}

impl From<ValidationError> for ReservationError {
    fn from(err: ValidationError) -> Self {
        ReservationError::Validation(err.0)
    }
}

impl From<StoreError> for ReservationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SessionNotFound(id) => ReservationError::SessionNotFound(id),
            StoreError::RegistrationNotFound(id) => ReservationError::RegistrationNotFound(id),
            StoreError::Capacity {
                requested,
                remaining,
            } => ReservationError::CapacityExceeded {
                requested,
                remaining,
            },
            // 报名流程自行处理唯一冲突，其他地方出现即属异常
            other @ StoreError::Duplicate => ReservationError::Store(other.to_string()),
            StoreError::Transient(msg) => ReservationError::Transient(msg),
            StoreError::Backend(msg) => ReservationError::Store(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_keeps_its_message() {
        let err = ReservationError::from(ValidationError("参访人数至少为 1 人".into()));
        assert!(matches!(&err, ReservationError::Validation(msg) if msg == "参访人数至少为 1 人"));
        assert_eq!(err.user_message(), "参访人数至少为 1 人");
    }

    #[test]
    fn stray_duplicate_is_an_internal_error() {
        let err = ReservationError::from(StoreError::Duplicate);
        assert!(matches!(err, ReservationError::Store(_)));
        assert_eq!(err.code(), "InternalError");
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(ReservationError::from(StoreError::Transient("40001".into())).is_retryable());
        assert!(!ReservationError::from(StoreError::Backend("boom".into())).is_retryable());
        assert!(!ReservationError::AlreadyRegistered("S1".into()).is_retryable());
    }
}

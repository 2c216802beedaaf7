use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::identity::AuthError;
use crate::service::ReservationError;

/// 接口层错误。预约服务的错误在这里统一映射为 HTTP 状态码与错误码，不产生新的语义。
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(#[from] AuthError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("not found")]
    NotFound,
    #[error("rate limited")]
    RateLimited { window_secs: u64 },
    #[error(transparent)]
    Reservation(#[from] ReservationError),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub error: &'static str,
    pub error_message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) | ApiError::InvalidSignature => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Reservation(e) => match e {
                ReservationError::Validation(_) => StatusCode::BAD_REQUEST,
                ReservationError::Unauthorized(_) => StatusCode::FORBIDDEN,
                ReservationError::SessionNotFound(_)
                | ReservationError::RegistrationNotFound(_) => StatusCode::NOT_FOUND,
                ReservationError::CapacityExceeded { .. }
                | ReservationError::AlreadyRegistered(_)
                | ReservationError::AlreadyCancelled(_)
                | ReservationError::SessionClosed(_) => StatusCode::CONFLICT,
                ReservationError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
                ReservationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "Unauthenticated",
            ApiError::BadRequest(_) => "ValidationError",
            ApiError::InvalidSignature => "InvalidSignature",
            ApiError::NotFound => "NotFound",
            ApiError::RateLimited { .. } => "RateLimited",
            ApiError::Internal(_) => "InternalError",
            ApiError::Reservation(e) => e.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthenticated(_) => "未登录或登录已过期".to_string(),
            ApiError::BadRequest(msg) => format!("请求格式错误：{}", msg),
            ApiError::InvalidSignature => "签名验证失败".to_string(),
            ApiError::NotFound => "资源不存在".to_string(),
            ApiError::RateLimited { window_secs } => {
                format!("请求过于频繁，请在{}秒后重试", window_secs)
            }
            ApiError::Internal(_) => "内部服务器错误".to_string(),
            ApiError::Reservation(e) => e.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            code: status.as_u16(),
            error: self.code(),
            error_message: self.message(),
        });

        (status, body).into_response()
    }
}

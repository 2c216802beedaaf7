use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{AppState, error::ApiError, identity::AuthError};

/// 管理员接口：Bearer 令牌需与 ADMIN_TOKEN_HASH 中的 bcrypt 哈希匹配。
/// 未配置管理员时接口不存在。
pub async fn admin_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(hash) = state.config.admin_token_hash.as_deref() else {
        return Err(ApiError::NotFound);
    };
    let TypedHeader(auth) = bearer.ok_or(AuthError::MissingCredential)?;

    match bcrypt::verify(auth.token(), hash) {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => {
            tracing::warn!("Rejected admin token");
            Err(AuthError::InvalidCredential("admin token mismatch".into()).into())
        }
        Err(e) => {
            tracing::error!("Invalid ADMIN_TOKEN_HASH: {}", e);
            Err(ApiError::Internal(e.to_string()))
        }
    }
}

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    extract::CookieJar,
    headers::{Authorization, authorization::Bearer},
};

use crate::{
    AppState,
    error::ApiError,
    identity::{AuthError, Credential},
};

/// 解析请求身份：优先读取 `Authorization: Bearer`，其次读取会话 Cookie。
/// 解析成功后将 [`UserIdentity`](crate::identity::UserIdentity) 放入请求扩展。
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer
        .map(|TypedHeader(auth)| auth.token().to_string())
        .or_else(|| {
            jar.get(&state.config.session_cookie_name)
                .map(|c| c.value().to_string())
        })
        .ok_or(AuthError::MissingCredential)?;

    let identity = state
        .identity
        .resolve(&Credential::Token(token))
        .await
        .inspect_err(|e| tracing::debug!("Rejected credential: {}", e))?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    middleware::{RateLimiter, admin_middleware, auth_middleware, log_errors, rate_limit},
};

pub mod admin;
pub mod line;
pub mod registration;
pub mod session;
pub mod user;

/// 组装全部路由。`rate_limiter` 为 `None` 时不限流。
pub fn build_router(state: AppState, rate_limiter: Option<Arc<RateLimiter>>) -> Router {
    // 公开路由
    let public_routes = Router::new()
        .route("/sessions", get(session::list_sessions))
        .route("/sessions/{id}", get(session::get_session))
        .route("/line/webhook", post(line::webhook));

    // 需要登录的路由
    let protected_routes = Router::new()
        .route("/me", get(user::me))
        .route("/registrations", post(registration::register_visit))
        .route("/registrations/mine", get(registration::list_my_registrations))
        .route(
            "/registrations/{id}/cancel",
            post(registration::cancel_registration),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // 管理员路由
    let admin_routes = Router::new()
        .route("/admin/sessions/seed", post(admin::seed_sessions))
        .route("/admin/sessions/{id}/close", post(admin::close_session))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            admin_middleware,
        ));

    let api = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes);

    // 根路径不能 nest，只能 merge
    let base = state.config.api_base_uri.clone();
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(&base, api)
    };

    let router = router
        .layer(axum::middleware::from_fn(log_errors))
        .layer(TraceLayer::new_for_http());

    let router = match rate_limiter {
        Some(limiter) => router.layer(axum::middleware::from_fn_with_state(limiter, rate_limit)),
        None => router,
    };

    router.with_state(state)
}

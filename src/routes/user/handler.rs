use axum::{Extension, Json};

use crate::identity::UserIdentity;

/// 当前登录用户
#[axum::debug_handler]
pub async fn me(Extension(identity): Extension<UserIdentity>) -> Json<UserIdentity> {
    Json(identity)
}

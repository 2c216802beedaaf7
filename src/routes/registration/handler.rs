use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
};

use super::model::{
    CancelRegistrationRequest, CancelRegistrationResponse, CreateRegistrationRequest,
    CreateRegistrationResponse, MyRegistration,
};
use crate::{AppState, error::ApiError, identity::UserIdentity};

#[axum::debug_handler]
pub async fn register_visit(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    payload: Result<Json<CreateRegistrationRequest>, JsonRejection>,
) -> Result<Json<CreateRegistrationResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (session_id, details) = req.into_parts();

    let id = state
        .reservations
        .register_visit(&session_id, &identity.id, details)
        .await?;

    Ok(Json(CreateRegistrationResponse { id }))
}

#[axum::debug_handler]
pub async fn list_my_registrations(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> Result<Json<Vec<MyRegistration>>, ApiError> {
    let registrations = state
        .reservations
        .get_user_registrations(&identity.id)
        .await?;

    Ok(Json(
        registrations.into_iter().map(MyRegistration::from).collect(),
    ))
}

#[axum::debug_handler]
pub async fn cancel_registration(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(registration_id): Path<String>,
    body: Bytes,
) -> Result<Json<CancelRegistrationResponse>, ApiError> {
    // 请求体可省略，省略时使用默认取消原因
    let req: CancelRegistrationRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CancelRegistrationRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    let cancelled = state
        .reservations
        .cancel_registration(&registration_id, &identity.id, req.reason.as_deref())
        .await?;

    Ok(Json(CancelRegistrationResponse {
        id: cancelled.id,
        status: cancelled.status,
        cancel_reason: cancelled.cancel_reason,
        cancelled_at: cancelled.cancelled_at,
    }))
}

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

use super::model::{SeedSessionsRequest, SeedSessionsResponse};
use crate::{AppState, error::ApiError, routes::session::SessionInfo};

#[axum::debug_handler]
pub async fn seed_sessions(
    State(state): State<AppState>,
    payload: Result<Json<SeedSessionsRequest>, JsonRejection>,
) -> Result<Json<SeedSessionsResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let submitted = req.sessions.len();
    let inserted = state.reservations.seed_sessions(req.sessions).await?;

    Ok(Json(SeedSessionsResponse {
        submitted,
        inserted,
    }))
}

#[axum::debug_handler]
pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionInfo>, ApiError> {
    let session = state.reservations.close_session(&session_id).await?;
    Ok(Json(SessionInfo::from(session)))
}

use axum::{
    Json,
    extract::{Path, State},
};

use super::model::SessionInfo;
use crate::{AppState, error::ApiError};

#[axum::debug_handler]
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionInfo>>, ApiError> {
    let sessions = state.reservations.list_open_sessions().await?;
    Ok(Json(sessions.into_iter().map(SessionInfo::from).collect()))
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionInfo>, ApiError> {
    let session = state.reservations.get_session(&session_id).await?;
    Ok(Json(SessionInfo::from(session)))
}

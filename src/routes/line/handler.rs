use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use futures_util::future::join_all;

use crate::{
    AppState,
    error::ApiError,
    identity::{Credential, LINE_PROVIDER, UserIdentity},
    line::{
        Command, NotificationGateway, SIGNATURE_HEADER, WebhookBody, WebhookEvent, reply,
        verify_signature,
    },
    models::RegistrationDetails,
    service::ReservationError,
};

/// LINE webhook。签名验证通过后总是返回 200，事件处理结果通过回复消息告知用户。
#[axum::debug_handler]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let (Some(secret), Some(gateway)) = (
        state.config.line_channel_secret.as_deref(),
        state.line.clone(),
    ) else {
        return Err(ApiError::NotFound);
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::InvalidSignature)?;
    if !verify_signature(secret, &body, signature) {
        tracing::warn!("Rejected LINE webhook with invalid signature");
        return Err(ApiError::InvalidSignature);
    }

    // 签名有效时一律回 200
    let payload: WebhookBody = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Ignoring unreadable LINE webhook body: {}", e);
            return Ok(StatusCode::OK);
        }
    };
    tracing::debug!(
        destination = payload.destination.as_deref().unwrap_or_default(),
        events = payload.events.len(),
        "LINE webhook received"
    );

    join_all(
        payload
            .events
            .iter()
            .map(|event| handle_event(&state, gateway.as_ref(), event)),
    )
    .await;

    Ok(StatusCode::OK)
}

async fn handle_event(state: &AppState, gateway: &dyn NotificationGateway, event: &WebhookEvent) {
    let Some(command) = event.command() else {
        tracing::debug!(kind = %event.kind, "Ignoring LINE event");
        return;
    };
    let (Some(line_user_id), Some(reply_token)) = (event.user_id(), event.reply_token.as_deref())
    else {
        return;
    };

    let credential = Credential::ExternalAccount {
        provider: LINE_PROVIDER.to_string(),
        account_id: line_user_id.to_string(),
    };
    let identity = match state.identity.resolve(&credential).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(line_user_id, "Failed to resolve LINE user: {}", e);
            return;
        }
    };

    let text = match execute(state, gateway, &identity, command).await {
        Ok(text) => text,
        Err(e) => e.user_message(),
    };

    if let Err(e) = gateway.reply(reply_token, vec![text]).await {
        tracing::warn!(line_user_id, "Failed to reply LINE message: {}", e);
    }
}

async fn execute(
    state: &AppState,
    gateway: &dyn NotificationGateway,
    identity: &UserIdentity,
    command: Command,
) -> Result<String, ReservationError> {
    let reservations = &state.reservations;
    match command {
        Command::ListSessions => {
            let sessions = reservations.list_open_sessions().await?;
            Ok(reply::sessions_text(&sessions))
        }
        Command::MyRegistrations => {
            let registrations = reservations.get_user_registrations(&identity.id).await?;
            Ok(reply::registrations_text(&registrations))
        }
        Command::Register {
            session_id,
            visitors,
            name,
            cellphone,
            remark,
        } => {
            let name = match name.filter(|n| !n.trim().is_empty()) {
                Some(name) => name,
                None => display_name(gateway, identity).await.unwrap_or_default(),
            };
            let details = RegistrationDetails {
                name,
                cellphone: cellphone.unwrap_or_default(),
                visitors,
                remark,
            };
            let id = reservations
                .register_visit(&session_id, &identity.id, details)
                .await?;
            let session = reservations.get_session(&session_id).await.ok();
            Ok(reply::registered_text(&id, session.as_ref()))
        }
        Command::Cancel {
            registration_id,
            reason,
        } => {
            let cancelled = reservations
                .cancel_registration(&registration_id, &identity.id, reason.as_deref())
                .await?;
            Ok(reply::cancelled_text(&cancelled))
        }
    }
}

async fn display_name(
    gateway: &dyn NotificationGateway,
    identity: &UserIdentity,
) -> Option<String> {
    let line_user_id = identity.line_user_id.as_deref()?;
    match gateway.display_name(line_user_id).await {
        Ok(name) => name.or_else(|| identity.name.clone()),
        Err(e) => {
            tracing::debug!(line_user_id, "Failed to fetch LINE profile: {}", e);
            identity.name.clone()
        }
    }
}

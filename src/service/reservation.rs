use chrono::Utc;
use std::sync::Arc;

use super::error::ReservationError;
use super::retry::{RetryPolicy, retry_with_backoff};
use crate::cache::SessionCache;
use crate::models::{
    NewSession, RegistrationDetails, RegistrationWithSession, SessionStatus, ValidatedDetails,
    VisitRegistration, VisitSession, cancel_reason_or_default,
};
use crate::store::{ReservationStore, StoreError};

/// 参访报名的核心服务。
///
/// 报名与取消都在单个存储事务内完成：读取并锁定场次、检查名额与重复报名、
/// 调整剩余名额、写入报名记录，任何一步失败整个事务回滚。
/// 存储层返回的暂时性错误（序列化冲突、超时）按 [`RetryPolicy`] 重试。
#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn ReservationStore>,
    cache: SessionCache,
    retry: RetryPolicy,
}

impl ReservationService {
    pub fn new(store: Arc<dyn ReservationStore>, cache: SessionCache, retry: RetryPolicy) -> Self {
        Self {
            store,
            cache,
            retry,
        }
    }

    /// 开放中的场次，优先读取缓存
    pub async fn list_open_sessions(&self) -> Result<Vec<VisitSession>, ReservationError> {
        if let Some(sessions) = self.cache.get_open_sessions().await {
            return Ok(sessions);
        }
        let generation = self.cache.generation();
        let sessions = self.store.list_open_sessions().await?;
        self.cache.set_open_sessions(&sessions, generation).await;
        Ok(sessions)
    }

    pub async fn get_session(&self, id: &str) -> Result<VisitSession, ReservationError> {
        self.store
            .get_session(id)
            .await?
            .ok_or_else(|| ReservationError::SessionNotFound(id.to_string()))
    }

    /// 报名参访，成功时返回报名 ID
    pub async fn register_visit(
        &self,
        session_id: &str,
        user_id: &str,
        details: RegistrationDetails,
    ) -> Result<String, ReservationError> {
        let details = details.validate()?;

        let registration = retry_with_backoff(
            &self.retry,
            ReservationError::is_retryable,
            || self.try_register(session_id, user_id, details.clone()),
        )
        .await
        .inspect_err(|e| log_failure("register", session_id, user_id, e))?;

        self.cache.invalidate_open_sessions().await;
        tracing::info!(
            registration_id = %registration.id,
            session_id,
            user_id,
            visitors = registration.visitors,
            "Visit registered"
        );
        Ok(registration.id)
    }

    async fn try_register(
        &self,
        session_id: &str,
        user_id: &str,
        details: ValidatedDetails,
    ) -> Result<VisitRegistration, ReservationError> {
        let mut tx = self.store.begin().await?;

        let session = tx
            .lock_session(session_id)
            .await?
            .ok_or_else(|| ReservationError::SessionNotFound(session_id.to_string()))?;

        if !session.is_open() {
            return Err(ReservationError::SessionClosed(session_id.to_string()));
        }

        if session.remaining_seats < details.visitors {
            return Err(ReservationError::CapacityExceeded {
                requested: details.visitors,
                remaining: session.remaining_seats,
            });
        }

        if tx.find_confirmed(session_id, user_id).await?.is_some() {
            return Err(ReservationError::AlreadyRegistered(session_id.to_string()));
        }

        tx.update_remaining_seats(session_id, -details.visitors).await?;

        let registration = VisitRegistration::confirmed(session_id, user_id, details);
        tx.create_registration(&registration)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate => {
                    ReservationError::AlreadyRegistered(session_id.to_string())
                }
                other => other.into(),
            })?;

        tx.commit().await?;
        Ok(registration)
    }

    /// 取消报名并归还名额。只能取消自己的报名。
    pub async fn cancel_registration(
        &self,
        registration_id: &str,
        user_id: &str,
        reason: Option<&str>,
    ) -> Result<VisitRegistration, ReservationError> {
        let reason = cancel_reason_or_default(reason);

        let (registration, session) = retry_with_backoff(
            &self.retry,
            ReservationError::is_retryable,
            || self.try_cancel(registration_id, user_id, &reason),
        )
        .await
        .inspect_err(|e| log_failure("cancel", registration_id, user_id, e))?;

        self.cache.invalidate_open_sessions().await;
        tracing::info!(
            registration_id,
            session_id = %session.id,
            user_id,
            reclaimed = registration.visitors,
            remaining_seats = session.remaining_seats,
            "Registration cancelled"
        );
        Ok(registration)
    }

    async fn try_cancel(
        &self,
        registration_id: &str,
        user_id: &str,
        reason: &str,
    ) -> Result<(VisitRegistration, VisitSession), ReservationError> {
        let mut tx = self.store.begin().await?;

        let registration = tx
            .lock_registration(registration_id)
            .await?
            .ok_or_else(|| ReservationError::RegistrationNotFound(registration_id.to_string()))?;

        if registration.user_id != user_id {
            return Err(ReservationError::Unauthorized(registration_id.to_string()));
        }

        if registration.is_cancelled() {
            return Err(ReservationError::AlreadyCancelled(registration_id.to_string()));
        }

        tx.lock_session(&registration.session_id)
            .await?
            .ok_or_else(|| ReservationError::SessionNotFound(registration.session_id.clone()))?;

        let cancelled = tx
            .mark_cancelled(registration_id, reason, Utc::now())
            .await?;
        let session = tx
            .update_remaining_seats(&registration.session_id, registration.visitors)
            .await?;

        tx.commit().await?;
        Ok((cancelled, session))
    }

    /// 用户所有有效报名及场次快照，最新的在前
    pub async fn get_user_registrations(
        &self,
        user_id: &str,
    ) -> Result<Vec<RegistrationWithSession>, ReservationError> {
        let mut registrations = self.store.list_confirmed_by_user(user_id).await?;
        registrations.sort_by(|a, b| b.registration.timestamp.cmp(&a.registration.timestamp));
        Ok(registrations)
    }

    /// 初始化场次，已存在的 ID 不会被覆盖。返回新增数量。
    pub async fn seed_sessions(&self, sessions: Vec<NewSession>) -> Result<u64, ReservationError> {
        for session in &sessions {
            session.validate()?;
        }
        let sessions: Vec<VisitSession> =
            sessions.into_iter().map(NewSession::into_session).collect();
        let inserted = self.store.insert_sessions(&sessions).await?;
        self.cache.invalidate_open_sessions().await;
        tracing::info!(submitted = sessions.len(), inserted, "Sessions seeded");
        Ok(inserted)
    }

    /// 关闭场次，不再接受报名
    pub async fn close_session(&self, id: &str) -> Result<VisitSession, ReservationError> {
        let session = self
            .store
            .set_session_status(id, SessionStatus::Closed)
            .await?
            .ok_or_else(|| ReservationError::SessionNotFound(id.to_string()))?;
        self.cache.invalidate_open_sessions().await;
        tracing::info!(session_id = id, "Session closed");
        Ok(session)
    }
}

fn log_failure(operation: &str, target_id: &str, user_id: &str, err: &ReservationError) {
    match err {
        ReservationError::Store(_) | ReservationError::Transient(_) => tracing::error!(
            operation,
            target_id,
            user_id,
            error = %err,
            "Reservation store failure"
        ),
        _ => tracing::debug!(
            operation,
            target_id,
            user_id,
            code = err.code(),
            "Reservation rejected"
        ),
    }
}

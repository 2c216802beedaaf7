// 内存存储
// 用于测试与无数据库的本地开发。事务开始时复制整张表，提交时整体写回，
// 互斥锁保证同一时刻只有一个事务在执行。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{ReservationStore, StoreError, StoreResult, StoreTransaction};
use crate::models::{
    RegistrationStatus, RegistrationWithSession, SessionStatus, VisitRegistration, VisitSession,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    sessions: HashMap<String, VisitSession>,
    registrations: HashMap<String, VisitRegistration>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: impl IntoIterator<Item = VisitSession>) -> Self {
        let tables = Tables {
            sessions: sessions
                .into_iter()
                .map(|session| (session.id.clone(), session))
                .collect(),
            registrations: HashMap::new(),
        };
        Self {
            tables: Arc::new(Mutex::new(tables)),
        }
    }

    /// 包括已取消在内的全部报名记录
    pub async fn registrations(&self) -> Vec<VisitRegistration> {
        self.tables
            .lock()
            .await
            .registrations
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn list_open_sessions(&self) -> StoreResult<Vec<VisitSession>> {
        let tables = self.tables.lock().await;
        let mut sessions: Vec<VisitSession> = tables
            .sessions
            .values()
            .filter(|s| s.is_open())
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.date.cmp(&b.date).then(a.order.cmp(&b.order)));
        Ok(sessions)
    }

    async fn get_session(&self, id: &str) -> StoreResult<Option<VisitSession>> {
        Ok(self.tables.lock().await.sessions.get(id).cloned())
    }

    async fn list_confirmed_by_user(
        &self,
        user_id: &str,
    ) -> StoreResult<Vec<RegistrationWithSession>> {
        let tables = self.tables.lock().await;
        let mut joined: Vec<RegistrationWithSession> = tables
            .registrations
            .values()
            .filter(|r| r.user_id == user_id && r.status == RegistrationStatus::Confirmed)
            .filter_map(|r| {
                tables
                    .sessions
                    .get(&r.session_id)
                    .map(|session| RegistrationWithSession {
                        registration: r.clone(),
                        session: session.clone(),
                    })
            })
            .collect();
        joined.sort_by(|a, b| b.registration.timestamp.cmp(&a.registration.timestamp));
        Ok(joined)
    }

    async fn insert_sessions(&self, sessions: &[VisitSession]) -> StoreResult<u64> {
        let mut tables = self.tables.lock().await;
        let mut inserted = 0;
        for session in sessions {
            if !tables.sessions.contains_key(&session.id) {
                tables.sessions.insert(session.id.clone(), session.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn set_session_status(
        &self,
        id: &str,
        status: SessionStatus,
    ) -> StoreResult<Option<VisitSession>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.sessions.get_mut(id).map(|session| {
            session.status = status;
            session.clone()
        }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn lock_session(&mut self, id: &str) -> StoreResult<Option<VisitSession>> {
        Ok(self.working.sessions.get(id).cloned())
    }

    async fn find_confirmed(
        &mut self,
        session_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<VisitRegistration>> {
        Ok(self
            .working
            .registrations
            .values()
            .find(|r| {
                r.session_id == session_id
                    && r.user_id == user_id
                    && r.status == RegistrationStatus::Confirmed
            })
            .cloned())
    }

    async fn update_remaining_seats(&mut self, id: &str, delta: i32) -> StoreResult<VisitSession> {
        let session = self
            .working
            .sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::SessionNotFound(id.to_string()))?;
        let next = session.seats_after(delta).ok_or(StoreError::Capacity {
            requested: -delta,
            remaining: session.remaining_seats,
        })?;
        session.remaining_seats = next;
        Ok(session.clone())
    }

    async fn create_registration(&mut self, registration: &VisitRegistration) -> StoreResult<()> {
        let duplicate = registration.status == RegistrationStatus::Confirmed
            && self.working.registrations.values().any(|r| {
                r.session_id == registration.session_id
                    && r.user_id == registration.user_id
                    && r.status == RegistrationStatus::Confirmed
            });
        if duplicate || self.working.registrations.contains_key(&registration.id) {
            return Err(StoreError::Duplicate);
        }
        self.working
            .registrations
            .insert(registration.id.clone(), registration.clone());
        Ok(())
    }

    async fn lock_registration(&mut self, id: &str) -> StoreResult<Option<VisitRegistration>> {
        Ok(self.working.registrations.get(id).cloned())
    }

    async fn mark_cancelled(
        &mut self,
        id: &str,
        reason: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<VisitRegistration> {
        let registration = self
            .working
            .registrations
            .get_mut(id)
            .ok_or_else(|| StoreError::RegistrationNotFound(id.to_string()))?;
        registration.cancel(reason.to_string(), at);
        Ok(registration.clone())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

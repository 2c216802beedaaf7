// PostgreSQL 存储
// 场次行在事务内以 SELECT ... FOR UPDATE 锁定，名额更新为带条件的 UPDATE

mod registration;
mod session;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use super::{ReservationStore, StoreError, StoreResult, StoreTransaction};
use crate::models::{RegistrationWithSession, SessionStatus, VisitRegistration, VisitSession};

pub use registration::RegistrationOperation;
pub use session::SessionOperation;

// PostgreSQL 错误码
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => {
                StoreError::Transient(err.to_string())
            }
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => {
                    StoreError::Transient(db.message().to_string())
                }
                Some(UNIQUE_VIOLATION) => StoreError::Duplicate,
                _ => StoreError::Backend(err.to_string()),
            },
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 执行 migrations/ 目录下的数据库迁移
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn list_open_sessions(&self) -> StoreResult<Vec<VisitSession>> {
        SessionOperation::list_open(&self.pool).await
    }

    async fn get_session(&self, id: &str) -> StoreResult<Option<VisitSession>> {
        SessionOperation::find_by_id(&self.pool, id).await
    }

    async fn list_confirmed_by_user(
        &self,
        user_id: &str,
    ) -> StoreResult<Vec<RegistrationWithSession>> {
        RegistrationOperation::list_confirmed_by_user(&self.pool, user_id).await
    }

    async fn insert_sessions(&self, sessions: &[VisitSession]) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for session in sessions {
            inserted += SessionOperation::insert_if_absent(&mut tx, session).await?;
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn set_session_status(
        &self,
        id: &str,
        status: SessionStatus,
    ) -> StoreResult<Option<VisitSession>> {
        SessionOperation::set_status(&self.pool, id, status).await
    }
}

struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn lock_session(&mut self, id: &str) -> StoreResult<Option<VisitSession>> {
        SessionOperation::find_for_update(&mut self.tx, id).await
    }

    async fn find_confirmed(
        &mut self,
        session_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<VisitRegistration>> {
        RegistrationOperation::find_confirmed(&mut self.tx, session_id, user_id).await
    }

    async fn update_remaining_seats(&mut self, id: &str, delta: i32) -> StoreResult<VisitSession> {
        SessionOperation::update_remaining_seats(&mut self.tx, id, delta).await
    }

    async fn create_registration(&mut self, registration: &VisitRegistration) -> StoreResult<()> {
        RegistrationOperation::insert(&mut self.tx, registration).await
    }

    async fn lock_registration(&mut self, id: &str) -> StoreResult<Option<VisitRegistration>> {
        RegistrationOperation::find_for_update(&mut self.tx, id).await
    }

    async fn mark_cancelled(
        &mut self,
        id: &str,
        reason: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<VisitRegistration> {
        RegistrationOperation::mark_cancelled(&mut self.tx, id, reason, at).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failures_are_transient() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Transient(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolClosed),
            StoreError::Transient(_)
        ));
    }

    #[test]
    fn other_failures_are_backend_errors() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }
}

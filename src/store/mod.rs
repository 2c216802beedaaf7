// 存储模块
// 定义场次与报名的存储接口，提供 PostgreSQL 与内存两种实现

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{RegistrationWithSession, SessionStatus, VisitRegistration, VisitSession};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error("registration {0} not found")]
    RegistrationNotFound(String),
    #[error("insufficient seats: requested {requested}, remaining {remaining}")]
    Capacity { requested: i32, remaining: i32 },
    #[error("a confirmed registration already exists for this session and user")]
    Duplicate,
    /// 可重试：序列化冲突、死锁、连接超时等
    #[error("transient store failure: {0}")]
    Transient(String),
    #[error("store failure: {0}")]
    Backend(String),
}

/// 报名与场次的持久化存储。
///
/// 只读查询直接在存储上执行；所有涉及名额变动的写入都必须经由
/// [`ReservationStore::begin`] 开启的事务完成。
#[async_trait]
pub trait ReservationStore: Send + Sync + 'static {
    /// 开启一个事务。事务在 `commit` 之前被丢弃即视为回滚。
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    /// 开放中的场次，按日期、排序键升序
    async fn list_open_sessions(&self) -> StoreResult<Vec<VisitSession>>;

    async fn get_session(&self, id: &str) -> StoreResult<Option<VisitSession>>;

    /// 用户所有已确认的报名及场次快照，按报名时间倒序
    async fn list_confirmed_by_user(
        &self,
        user_id: &str,
    ) -> StoreResult<Vec<RegistrationWithSession>>;

    /// 写入新场次，已存在的 ID 保持不变。返回实际新增的数量。
    async fn insert_sessions(&self, sessions: &[VisitSession]) -> StoreResult<u64>;

    async fn set_session_status(
        &self,
        id: &str,
        status: SessionStatus,
    ) -> StoreResult<Option<VisitSession>>;
}

/// 单个事务内可执行的操作
#[async_trait]
pub trait StoreTransaction: Send {
    /// 读取场次并锁定，直到事务结束
    async fn lock_session(&mut self, id: &str) -> StoreResult<Option<VisitSession>>;

    async fn find_confirmed(
        &mut self,
        session_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<VisitRegistration>>;

    /// 按 delta 调整剩余名额（报名为负，取消为正），增加时不超过总名额。
    /// 结果低于 0 时返回 [`StoreError::Capacity`]。
    async fn update_remaining_seats(&mut self, id: &str, delta: i32) -> StoreResult<VisitSession>;

    async fn create_registration(&mut self, registration: &VisitRegistration) -> StoreResult<()>;

    /// 读取报名并锁定，直到事务结束
    async fn lock_registration(&mut self, id: &str) -> StoreResult<Option<VisitRegistration>>;

    async fn mark_cancelled(
        &mut self,
        id: &str,
        reason: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<VisitRegistration>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

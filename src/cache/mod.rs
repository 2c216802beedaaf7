// 缓存模块
// 开放场次列表的 Redis 缓存。缓存故障不影响请求，只记录日志。

use redis::{AsyncCommands, Client as RedisClient};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::models::VisitSession;

/// 开放场次列表的缓存键
pub const OPEN_SESSIONS_KEY: &str = "visit:sessions:open";

/// 开放场次列表的读穿缓存。
///
/// 每次清除缓存都会递增世代号。读取数据库前记下世代号，写回时若世代号已变，
/// 说明期间有报名或取消提交，这份列表可能已过期，不再写入。
/// 世代号只在本进程内共享，其他实例写入的过期列表最多保留 TTL 时长。
#[derive(Clone)]
pub struct SessionCache {
    redis: Option<Arc<RedisClient>>,
    ttl: Duration,
    generation: Arc<AtomicU64>,
}

impl SessionCache {
    pub fn new(redis: Arc<RedisClient>, ttl: Duration) -> Self {
        Self {
            redis: Some(redis),
            ttl,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 不使用缓存
    pub fn disabled() -> Self {
        Self {
            redis: None,
            ttl: Duration::ZERO,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.redis.is_some() && !self.ttl.is_zero()
    }

    /// 当前世代号，读取数据库前调用
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// 自 `read_generation` 以来是否发生过清除
    pub fn is_stale(&self, read_generation: u64) -> bool {
        self.generation() != read_generation
    }

    pub async fn get_open_sessions(&self) -> Option<Vec<VisitSession>> {
        if !self.is_enabled() {
            return None;
        }
        let redis = self.redis.as_ref()?;
        let mut conn = match redis.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Redis unavailable, skipping session cache: {}", e);
                return None;
            }
        };

        let cached: redis::RedisResult<Option<String>> = conn.get(OPEN_SESSIONS_KEY).await;
        match cached {
            Ok(Some(json)) => match serde_json::from_str::<Vec<VisitSession>>(&json) {
                Ok(sessions) => {
                    tracing::debug!("Get open sessions from cache: {}", OPEN_SESSIONS_KEY);
                    Some(sessions)
                }
                Err(e) => {
                    tracing::warn!("Discarding unreadable session cache entry: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("Session cache read failed: {}", e);
                None
            }
        }
    }

    /// 写入从数据库读到的列表。`read_generation` 为读取前的世代号，已过期时跳过。
    pub async fn set_open_sessions(&self, sessions: &[VisitSession], read_generation: u64) {
        if !self.is_enabled() {
            return;
        }
        if self.is_stale(read_generation) {
            tracing::debug!("Open sessions changed during read, skipping cache write");
            return;
        }
        let Some(redis) = self.redis.as_ref() else {
            return;
        };
        let Ok(json) = serde_json::to_string(sessions) else {
            return;
        };
        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            let result: redis::RedisResult<()> =
                conn.set_ex(OPEN_SESSIONS_KEY, json, self.ttl.as_secs()).await;
            match result {
                Ok(()) => tracing::debug!("Set open sessions to cache: {}", OPEN_SESSIONS_KEY),
                Err(e) => tracing::debug!("Session cache write failed: {}", e),
            }
        }
    }

    /// 名额或场次状态变动后清除缓存
    pub async fn invalidate_open_sessions(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let Some(redis) = self.redis.as_ref() else {
            return;
        };
        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            let result: redis::RedisResult<()> = conn.del(OPEN_SESSIONS_KEY).await;
            if let Err(e) = result {
                tracing::warn!("Failed to invalidate session cache: {}", e);
            }
        }
    }
}

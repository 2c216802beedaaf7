use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::AsyncCommands;

use crate::error::ApiError;

/// 基于 Redis 的固定窗口限流，按客户端 IP 计数
#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(redis: Arc<redis::Client>, window: Duration, max_requests: u32) -> Self {
        Self {
            redis,
            window,
            max_requests,
        }
    }

    fn client_ip(req: &Request<Body>) -> String {
        // 从连接信息获取原始IP
        let remote_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string());

        // 优先使用反向代理传入的请求头
        req.headers()
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .or_else(|| {
                req.headers()
                    .get("x-forwarded-for")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
            })
            .or(remote_ip.as_deref())
            .unwrap_or("unknown")
            .trim()
            .to_string()
    }

    /// 返回本窗口内的请求计数。Redis 不可用时返回 `None`，请求放行。
    async fn hit(&self, ip: &str) -> Option<i64> {
        let key = format!("rate_limit:{}", ip);
        let mut conn = match self.redis.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Rate limiter unavailable: {}", e);
                return None;
            }
        };

        // 使用 Redis 的 INCR 和 EXPIRE 命令实现计数器
        let count: i64 = match conn.incr(&key, 1).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Rate limiter unavailable: {}", e);
                return None;
            }
        };
        if count == 1 {
            // 窗口内第一次请求，设置过期时间
            let expired: redis::RedisResult<()> =
                conn.expire(&key, self.window.as_secs() as i64).await;
            if let Err(e) = expired {
                tracing::warn!("Failed to set rate limit window: {}", e);
            }
        }
        Some(count)
    }

    pub async fn check_rate_limit(&self, req: Request<Body>, next: Next) -> Response {
        let ip = Self::client_ip(&req);
        if let Some(count) = self.hit(&ip).await {
            if count > i64::from(self.max_requests) {
                tracing::debug!(ip, count, "Rate limit exceeded");
                return ApiError::RateLimited {
                    window_secs: self.window.as_secs(),
                }
                .into_response();
            }
        }
        next.run(req).await
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    limiter.check_rate_limit(req, next).await
}

//! 从 JSON 文件初始化参访场次：
//! `seed-sessions sessions.json`，文件内容为 `[{"id", "date", "time", "total_seats", "order"}]`。
//! 重复执行不会覆盖已存在的场次。

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visit_booking::{
    cache::SessionCache,
    config::Config,
    models::NewSession,
    service::{ReservationService, RetryPolicy},
    store::PgStore,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args()
        .nth(1)
        .expect("Usage: seed-sessions <sessions.json>");
    let raw = std::fs::read_to_string(&path).expect("Failed to read sessions file");
    let sessions: Vec<NewSession> = serde_json::from_str(&raw).expect("Invalid sessions file");

    let config = Config::from_env().expect("Failed to load configuration");
    let database_url = config
        .database_url
        .as_deref()
        .expect("DATABASE_URL is required for seeding");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .expect("Failed to connect to Postgres");
    let store = PgStore::new(pool);
    store.migrate().await.expect("Failed to run migrations");

    let cache = match &config.redis_url {
        Some(url) => SessionCache::new(
            Arc::new(redis::Client::open(url.clone()).expect("Failed to create Redis client")),
            config.sessions_cache_ttl(),
        ),
        None => SessionCache::disabled(),
    };

    let service = ReservationService::new(Arc::new(store), cache, RetryPolicy::default());
    match service.seed_sessions(sessions).await {
        Ok(inserted) => tracing::info!(inserted, file = %path, "Seeding finished"),
        Err(e) => {
            tracing::error!("Seeding failed: {}", e);
            std::process::exit(1);
        }
    }
}

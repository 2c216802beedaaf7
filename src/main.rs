use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visit_booking::{
    AppState,
    cache::SessionCache,
    config::Config,
    identity::JwtIdentityResolver,
    line::{LineClient, NotificationGateway},
    middleware::RateLimiter,
    routes,
    service::{ReservationService, RetryPolicy},
    store::{MemoryStore, PgStore, ReservationStore},
};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置存储
    let store: Arc<dyn ReservationStore> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .after_connect(|conn, _meta| {
                    Box::pin(async move {
                        conn.execute("SET application_name = 'visit_booking';")
                            .await?;
                        Ok(())
                    })
                })
                .connect(database_url)
                .await
                .expect("Failed to connect to Postgres");
            let store = PgStore::new(pool);
            store.migrate().await.expect("Failed to run migrations");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (data is not persisted)");
            Arc::new(MemoryStore::new())
        }
    };

    // 设置 Redis 客户端
    let redis = config.redis_url.as_ref().map(|url| {
        Arc::new(redis::Client::open(url.clone()).expect("Failed to create Redis client"))
    });
    let cache = match &redis {
        Some(client) => SessionCache::new(client.clone(), config.sessions_cache_ttl()),
        None => SessionCache::disabled(),
    };
    let rate_limiter = redis.as_ref().map(|client| {
        Arc::new(RateLimiter::new(
            client.clone(),
            config.rate_limit_window(),
            config.rate_limit_requests,
        ))
    });

    let line: Option<Arc<dyn NotificationGateway>> = match &config.line_channel_access_token {
        Some(token) if config.line_enabled() => {
            Some(Arc::new(LineClient::new(config.line_api_base.clone(), token.clone())))
        }
        _ => {
            tracing::info!("LINE channel not configured, webhook disabled");
            None
        }
    };

    let reservations = ReservationService::new(
        store,
        cache,
        RetryPolicy::new(
            config.reservation_max_retries,
            config.reservation_retry_delay(),
        ),
    );

    // 设置应用状态
    let state = AppState {
        config: Arc::new(config.clone()),
        reservations,
        identity: Arc::new(JwtIdentityResolver::new(&config.jwt_secret)),
        line,
    };

    let router = routes::build_router(state, rate_limiter);

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}

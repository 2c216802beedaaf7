use std::sync::Arc;

use config::Config;
use identity::IdentityResolver;
use line::NotificationGateway;
use service::ReservationService;

pub mod cache;
pub mod config;
pub mod error;
pub mod identity;
pub mod line;
pub mod middleware;
pub mod models;
pub mod service;
pub mod store;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub reservations: ReservationService,
    pub identity: Arc<dyn IdentityResolver>,
    /// 未配置 LINE 通道时为 `None`
    pub line: Option<Arc<dyn NotificationGateway>>,
}

// LINE 消息通道
// webhook 事件解析、签名验证，以及回复消息所用的 Messaging API 客户端

mod client;
pub mod event;
pub mod reply;
pub mod signature;

use async_trait::async_trait;
use thiserror::Error;

pub use client::LineClient;
pub use event::{Command, WebhookBody, WebhookEvent};
pub use signature::{SIGNATURE_HEADER, verify_signature};

/// LINE 单次回复最多 5 则消息
pub const MAX_REPLY_MESSAGES: usize = 5;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to messaging API failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("messaging API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// 消息通道：回复用户并读取用户资料
#[async_trait]
pub trait NotificationGateway: Send + Sync + 'static {
    async fn reply(&self, reply_token: &str, texts: Vec<String>) -> Result<(), GatewayError>;

    /// 用户在通道上的显示名称，查不到时返回 `None`
    async fn display_name(&self, user_id: &str) -> Result<Option<String>, GatewayError>;
}

// 身份解析
// 将请求携带的凭证解析为稳定的用户身份。凭证的签发由登录系统负责，这里只做验证。

mod jwt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use jwt::{Claims, JwtIdentityResolver};

/// 外部平台标识：LINE
pub const LINE_PROVIDER: &str = "line";

/// 已解析的用户身份
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
    /// 关联的 LINE 用户 ID
    pub line_user_id: Option<String>,
}

/// 请求携带的凭证
#[derive(Debug, Clone)]
pub enum Credential {
    /// Bearer 令牌或会话 Cookie 中的令牌
    Token(String),
    /// 外部平台账号，例如 LINE webhook 事件中的 userId
    ExternalAccount {
        provider: String,
        account_id: String,
    },
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
}

#[async_trait]
pub trait IdentityResolver: Send + Sync + 'static {
    async fn resolve(&self, credential: &Credential) -> Result<UserIdentity, AuthError>;
}

/// 外部平台账号对应的用户 ID，格式为 `<provider>:<account_id>`
pub fn external_user_id(provider: &str, account_id: &str) -> String {
    format!("{}:{}", provider, account_id)
}

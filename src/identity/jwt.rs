use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::{
    AuthError, Credential, IdentityResolver, LINE_PROVIDER, UserIdentity, external_user_id,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 用户ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_user_id: Option<String>,
    pub exp: i64, // 过期时间
    pub iat: i64, // 签发时间
}

/// 验证 HS256 签名的会话令牌
pub struct JwtIdentityResolver {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    validation: Validation,
}

impl JwtIdentityResolver {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// 为用户签发令牌，供登录系统与测试使用
    pub fn issue_token(
        &self,
        identity: &UserIdentity,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.id.clone(),
            name: identity.name.clone(),
            picture: identity.image.clone(),
            line_user_id: identity.line_user_id.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidCredential(e.to_string()))
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, credential: &Credential) -> Result<UserIdentity, AuthError> {
        match credential {
            Credential::Token(token) => {
                let token = token.trim();
                if token.is_empty() {
                    return Err(AuthError::MissingCredential);
                }
                let claims = self.verify_token(token)?;
                if claims.sub.is_empty() {
                    return Err(AuthError::InvalidCredential("empty subject".into()));
                }
                Ok(UserIdentity {
                    id: claims.sub,
                    name: claims.name,
                    image: claims.picture,
                    line_user_id: claims.line_user_id,
                })
            }
            Credential::ExternalAccount {
                provider,
                account_id,
            } => {
                if account_id.is_empty() {
                    return Err(AuthError::MissingCredential);
                }
                Ok(UserIdentity {
                    id: external_user_id(provider, account_id),
                    name: None,
                    image: None,
                    line_user_id: (provider == LINE_PROVIDER).then(|| account_id.clone()),
                })
            }
        }
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{GatewayError, MAX_REPLY_MESSAGES, NotificationGateway};

/// LINE Messaging API 客户端
#[derive(Clone)]
pub struct LineClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<TextMessage>,
}

#[derive(Serialize)]
struct TextMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    display_name: Option<String>,
}

impl LineClient {
    pub fn new(api_base: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            access_token: access_token.into(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl NotificationGateway for LineClient {
    async fn reply(&self, reply_token: &str, texts: Vec<String>) -> Result<(), GatewayError> {
        let messages = texts
            .into_iter()
            .filter(|t| !t.is_empty())
            .take(MAX_REPLY_MESSAGES)
            .map(|text| TextMessage { kind: "text", text })
            .collect::<Vec<_>>();
        if messages.is_empty() {
            return Ok(());
        }

        let response = self
            .http
            .post(format!("{}/v2/bot/message/reply", self.api_base))
            .bearer_auth(&self.access_token)
            .json(&ReplyRequest {
                reply_token,
                messages,
            })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn display_name(&self, user_id: &str) -> Result<Option<String>, GatewayError> {
        let response = self
            .http
            .get(format!("{}/v2/bot/profile/{}", self.api_base, user_id))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let profile: Profile = Self::check(response).await?.json().await?;
        Ok(profile.display_name.filter(|n| !n.is_empty()))
    }
}

//! Slack Web API client for the calls the relay makes.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use syncbot_core::{
    ChatApi, ChatPostMessage, ChatPostedMessage, ChatThreadRoot, ChatUserProfile, RelayError,
};

const USER_AGENT: &str = "sync-bot";

#[derive(Debug, Clone, Deserialize)]
struct SlackAuthTestResponse {
    ok: bool,
    user_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackOpenSocketResponse {
    ok: bool,
    url: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackChatMessageResponse {
    ok: bool,
    ts: Option<String>,
    channel: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackHistoryBlock {
    #[serde(default)]
    block_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackHistoryMessage {
    ts: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    blocks: Vec<SlackHistoryBlock>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackHistoryResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<SlackHistoryMessage>,
    error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SlackProfile {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    real_name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackProfileResponse {
    ok: bool,
    #[serde(default)]
    profile: Option<SlackProfile>,
    error: Option<String>,
}

fn slack_error(operation: &str, error: Option<String>) -> anyhow::Error {
    anyhow!(
        "slack {operation} failed: {}",
        error.unwrap_or_else(|| "unknown error".to_string())
    )
}

fn truncate_for_error(raw: &str, max_chars: usize) -> String {
    if raw.chars().count() <= max_chars {
        return raw.to_string();
    }
    let truncated = raw.chars().take(max_chars).collect::<String>();
    format!("{truncated}...")
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    app_token: String,
    bot_token: String,
}

impl SlackApiClient {
    pub fn new(
        api_base: &str,
        app_token: &str,
        bot_token: &str,
        request_timeout_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(USER_AGENT),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            app_token: app_token.trim().to_string(),
            bot_token: bot_token.trim().to_string(),
        })
    }

    pub async fn resolve_bot_user_id(&self) -> Result<String> {
        let response: SlackAuthTestResponse = self
            .request_json(
                "auth.test",
                self.http
                    .post(format!("{}/auth.test", self.api_base))
                    .bearer_auth(&self.bot_token),
            )
            .await?;
        if !response.ok {
            return Err(slack_error("auth.test", response.error));
        }
        response
            .user_id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack auth.test did not return user_id"))
    }

    /// Requests a Socket Mode websocket URL with the app-level token.
    pub async fn open_socket_connection(&self) -> Result<String> {
        let response: SlackOpenSocketResponse = self
            .request_json(
                "apps.connections.open",
                self.http
                    .post(format!("{}/apps.connections.open", self.api_base))
                    .bearer_auth(&self.app_token),
            )
            .await?;
        if !response.ok {
            return Err(slack_error("apps.connections.open", response.error));
        }
        response
            .url
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack apps.connections.open did not return url"))
    }

    pub async fn post_chat_message(&self, message: &ChatPostMessage) -> Result<ChatPostedMessage> {
        let mut payload = json!({
            "channel": message.channel,
            "text": message.text,
            "unfurl_links": false,
            "unfurl_media": false,
        });
        if let Some(thread_ts) = message.thread_ts.as_deref() {
            payload["thread_ts"] = Value::String(thread_ts.to_string());
        }
        if let Some(blocks) = message.blocks.as_ref() {
            payload["blocks"] = blocks.clone();
        }

        let response: SlackChatMessageResponse = self
            .request_json(
                "chat.postMessage",
                self.http
                    .post(format!("{}/chat.postMessage", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .json(&payload),
            )
            .await?;
        if !response.ok {
            return Err(slack_error("chat.postMessage", response.error));
        }
        Ok(ChatPostedMessage {
            channel: response
                .channel
                .unwrap_or_else(|| message.channel.clone()),
            ts: response.ts.ok_or(RelayError::MissingField {
                operation: "slack chat.postMessage",
                field: "ts",
            })?,
        })
    }

    /// Reads the newest message at or before `thread_ts`, which is the
    /// thread root when `thread_ts` names one.
    pub async fn conversation_root(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Option<ChatThreadRoot>> {
        let url = format!(
            "{}/conversations.history?channel={}&latest={}&limit=1&inclusive=true",
            self.api_base,
            urlencoding::encode(channel),
            urlencoding::encode(thread_ts)
        );
        let response: SlackHistoryResponse = self
            .request_json(
                "conversations.history",
                self.http.get(url).bearer_auth(&self.bot_token),
            )
            .await?;
        if !response.ok {
            return Err(slack_error("conversations.history", response.error));
        }
        Ok(response.messages.into_iter().next().map(|message| ChatThreadRoot {
            ts: message.ts,
            user_id: message.user,
            header_block_id: message
                .blocks
                .into_iter()
                .next()
                .and_then(|block| block.block_id),
        }))
    }

    pub async fn profile(&self, user_id: &str) -> Result<ChatUserProfile> {
        let url = format!(
            "{}/users.profile.get?user={}",
            self.api_base,
            urlencoding::encode(user_id)
        );
        let response: SlackProfileResponse = self
            .request_json(
                "users.profile.get",
                self.http.get(url).bearer_auth(&self.bot_token),
            )
            .await?;
        if !response.ok {
            return Err(slack_error("users.profile.get", response.error));
        }
        let profile = response.profile.unwrap_or_default();
        Ok(ChatUserProfile {
            display_name: profile.display_name,
            real_name: profile.real_name,
        })
    }

    /// Sends one request. Slack reports most failures as HTTP 200 with
    /// `ok: false`, so callers still check the decoded body.
    async fn request_json<T>(&self, operation: &str, request: reqwest::RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .with_context(|| format!("slack api {operation} request failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "slack api {operation} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 800)
            );
        }
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode slack {operation}"))
    }
}

#[async_trait]
impl ChatApi for SlackApiClient {
    async fn post_message(
        &self,
        message: &ChatPostMessage,
    ) -> Result<ChatPostedMessage, RelayError> {
        self.post_chat_message(message)
            .await
            .map_err(|error| match error.downcast::<RelayError>() {
                Ok(relay_error) => relay_error,
                Err(error) => {
                    RelayError::upstream("slack chat.postMessage", format!("{error:#}"))
                }
            })
    }

    async fn fetch_thread_root(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Option<ChatThreadRoot>, RelayError> {
        self.conversation_root(channel, thread_ts)
            .await
            .map_err(|error| {
                RelayError::upstream("slack conversations.history", format!("{error:#}"))
            })
    }

    async fn user_profile(&self, user_id: &str) -> Result<ChatUserProfile, RelayError> {
        self.profile(user_id)
            .await
            .map_err(|error| RelayError::upstream("slack users.profile.get", format!("{error:#}")))
    }
}

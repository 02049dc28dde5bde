//! Capability seams for the two platform APIs the relay talks to.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::repo_ref::RepoRef;

/// Failures surfaced by relay steps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("{operation} failed: {message}")]
    Upstream {
        operation: &'static str,
        message: String,
    },
    #[error("{operation} response missing {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },
    #[error("invalid repository '{0}', expected owner/repo")]
    InvalidRepo(String),
}

impl RelayError {
    pub fn upstream(operation: &'static str, message: impl ToString) -> Self {
        Self::Upstream {
            operation,
            message: message.to_string(),
        }
    }
}

/// Outbound `chat.postMessage` request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPostMessage {
    pub channel: String,
    pub text: String,
    pub thread_ts: Option<String>,
    pub blocks: Option<Value>,
}

impl ChatPostMessage {
    pub fn text(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            thread_ts: None,
            blocks: None,
        }
    }

    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    pub fn with_blocks(mut self, blocks: Value) -> Self {
        self.blocks = Some(blocks);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPostedMessage {
    pub channel: String,
    pub ts: String,
}

/// Root message of a Slack thread, as returned by `conversations.history`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatThreadRoot {
    pub ts: String,
    pub user_id: Option<String>,
    /// `block_id` of the first block, where the thread link is stored.
    pub header_block_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatUserProfile {
    pub display_name: String,
    pub real_name: String,
}

impl ChatUserProfile {
    /// Name used when attributing a relayed message, falling back to `user_id`.
    pub fn attribution_name(&self, user_id: &str) -> String {
        [self.display_name.trim(), self.real_name.trim()]
            .into_iter()
            .find(|name| !name.is_empty())
            .unwrap_or(user_id)
            .to_string()
    }
}

#[async_trait]
/// Team-chat operations used by the classifier and the relay engine.
pub trait ChatApi: Send + Sync {
    async fn post_message(&self, message: &ChatPostMessage)
        -> Result<ChatPostedMessage, RelayError>;

    async fn fetch_thread_root(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Option<ChatThreadRoot>, RelayError>;

    async fn user_profile(&self, user_id: &str) -> Result<ChatUserProfile, RelayError>;
}

#[async_trait]
/// Code-review operations used by the relay engine.
///
/// Implementations must resolve their credential on every call; a refresh may
/// swap it between two calls of the same relay run.
pub trait ReviewApi: Send + Sync {
    async fn update_pull_request_body(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<(), RelayError>;

    async fn create_issue_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<(), RelayError>;
}

//! Normalized inbound events from both platforms.

use serde::{Deserialize, Serialize};

use crate::repo_ref::RepoRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    Review,
    Chat,
}

impl EventOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Review => "github",
            Self::Chat => "slack",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Human,
    Automation,
}

impl ActorKind {
    /// Maps a GitHub `sender.type` value.
    pub fn from_github_sender_type(sender_type: &str) -> Self {
        if sender_type.trim().eq_ignore_ascii_case("bot") {
            Self::Automation
        } else {
            Self::Human
        }
    }
}

/// A label was applied to a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOpened {
    pub label: String,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub html_url: String,
    /// Repository that owns the pull request.
    pub repository: RepoRef,
}

/// A comment was created on an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAdded {
    pub actor_login: String,
    pub actor_kind: ActorKind,
    pub repository: RepoRef,
    pub number: u64,
    pub thread_body: String,
    pub comment_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewEvent {
    SubmissionOpened(SubmissionOpened),
    CommentAdded(CommentAdded),
}

impl ReviewEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SubmissionOpened(_) => "submission_opened",
            Self::CommentAdded(_) => "comment_added",
        }
    }

    pub fn number(&self) -> u64 {
        match self {
            Self::SubmissionOpened(event) => event.number,
            Self::CommentAdded(event) => event.number,
        }
    }
}

/// A Slack `message` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessagePosted {
    pub channel_id: String,
    pub user_id: Option<String>,
    pub parent_user_id: Option<String>,
    pub ts: String,
    pub thread_ts: Option<String>,
    pub subtype: Option<String>,
    pub bot_id: Option<String>,
    pub text: String,
}

impl ChatMessagePosted {
    pub fn is_threaded_reply(&self) -> bool {
        self.thread_ts
            .as_deref()
            .is_some_and(|thread_ts| !thread_ts.is_empty() && thread_ts != self.ts)
    }
}

//! Routing decisions for inbound events.
//!
//! A pull request moves from `no-link` to `linked` exactly once, when its body
//! first gains a marker. Only a qualifying label event on a `no-link` thread
//! may create a link; comments on a `no-link` thread are dropped, so a comment
//! racing the label event can never create a second Slack thread.

use tracing::debug;

use crate::correlation_token::{
    decode_from_chat_identifier, decode_from_review_body, ChatThreadLink, CorrelationToken,
};
use crate::platform_api::{ChatApi, RelayError};
use crate::relay_config::RelayConfig;
use crate::relay_event::{ActorKind, ChatMessagePosted, ReviewEvent, SubmissionOpened};

const RELAYABLE_CHAT_SUBTYPES: [&str; 2] = ["thread_broadcast", "file_share"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    LabelMismatch,
    AlreadyLinked,
    AutomationActor,
    NoLink,
    UnrelatedThread,
    SelfEcho,
    UnsupportedSubtype,
    MissingAuthor,
}

impl IgnoreReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LabelMismatch => "label_mismatch",
            Self::AlreadyLinked => "already_linked",
            Self::AutomationActor => "automation_actor",
            Self::NoLink => "no_link",
            Self::UnrelatedThread => "unrelated_thread",
            Self::SelfEcho => "self_echo",
            Self::UnsupportedSubtype => "unsupported_subtype",
            Self::MissingAuthor => "missing_author",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayDecision {
    CreateLink(SubmissionOpened),
    RelayToChat {
        token: CorrelationToken,
        actor_login: String,
        text: String,
    },
    RelayToReview {
        link: ChatThreadLink,
        user_id: String,
        text: String,
    },
    Ignore(IgnoreReason),
}

impl RelayDecision {
    pub fn role(&self) -> &'static str {
        match self {
            Self::CreateLink(_) => "create_link",
            Self::RelayToChat { .. } => "relay_to_chat",
            Self::RelayToReview { .. } => "relay_to_review",
            Self::Ignore(_) => "ignore",
        }
    }
}

pub fn classify_review_event(event: &ReviewEvent, config: &RelayConfig) -> RelayDecision {
    match event {
        ReviewEvent::SubmissionOpened(submission) => {
            if !config.is_submission_label(&submission.label) {
                return RelayDecision::Ignore(IgnoreReason::LabelMismatch);
            }
            if decode_from_review_body(&submission.body).is_some() {
                return RelayDecision::Ignore(IgnoreReason::AlreadyLinked);
            }
            RelayDecision::CreateLink(submission.clone())
        }
        ReviewEvent::CommentAdded(comment) => {
            if comment.actor_kind == ActorKind::Automation {
                return RelayDecision::Ignore(IgnoreReason::AutomationActor);
            }
            let Some(token) = decode_from_review_body(&comment.thread_body) else {
                return RelayDecision::Ignore(IgnoreReason::NoLink);
            };
            RelayDecision::RelayToChat {
                token,
                actor_login: comment.actor_login.clone(),
                text: comment.comment_body.clone(),
            }
        }
    }
}

/// Checks that don't need the thread root.
fn precheck_chat_message(
    message: &ChatMessagePosted,
    config: &RelayConfig,
) -> Result<(String, String), IgnoreReason> {
    if message.parent_user_id.as_deref() != Some(config.root_author_id.as_str()) {
        return Err(IgnoreReason::UnrelatedThread);
    }
    let thread_ts = match message.thread_ts.as_deref() {
        Some(thread_ts) if message.is_threaded_reply() => thread_ts.to_string(),
        _ => return Err(IgnoreReason::UnrelatedThread),
    };
    if message.subtype.as_deref() == Some("bot_message") || message.bot_id.is_some() {
        return Err(IgnoreReason::SelfEcho);
    }
    if let Some(subtype) = message.subtype.as_deref() {
        if !RELAYABLE_CHAT_SUBTYPES.contains(&subtype) {
            return Err(IgnoreReason::UnsupportedSubtype);
        }
    }
    let user_id = match message.user_id.as_deref().map(str::trim) {
        Some(user_id) if !user_id.is_empty() => user_id.to_string(),
        _ => return Err(IgnoreReason::MissingAuthor),
    };
    if user_id == config.bot_user_id {
        return Err(IgnoreReason::SelfEcho);
    }
    Ok((thread_ts, user_id))
}

/// Classifies a Slack message, reading its thread root to find the pull request.
pub async fn classify_chat_message(
    message: &ChatMessagePosted,
    config: &RelayConfig,
    chat: &dyn ChatApi,
) -> Result<RelayDecision, RelayError> {
    let (thread_ts, user_id) = match precheck_chat_message(message, config) {
        Ok(accepted) => accepted,
        Err(reason) => return Ok(RelayDecision::Ignore(reason)),
    };

    let root = chat
        .fetch_thread_root(&message.channel_id, &thread_ts)
        .await?
        .filter(|root| root.ts == thread_ts);
    if let Some(root_user_id) = root.as_ref().and_then(|root| root.user_id.as_deref()) {
        if root_user_id != config.root_author_id {
            debug!(
                channel = %message.channel_id,
                thread_ts = %thread_ts,
                root_user_id,
                "slack thread root authored by another user"
            );
            return Ok(RelayDecision::Ignore(IgnoreReason::UnrelatedThread));
        }
    }
    let link = root
        .and_then(|root| root.header_block_id)
        .and_then(|block_id| decode_from_chat_identifier(&block_id));
    let Some(link) = link else {
        debug!(
            channel = %message.channel_id,
            thread_ts = %thread_ts,
            "slack thread root carries no pull request link"
        );
        return Ok(RelayDecision::Ignore(IgnoreReason::NoLink));
    };

    Ok(RelayDecision::RelayToReview {
        link,
        user_id,
        text: message.text.clone(),
    })
}

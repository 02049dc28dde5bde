//! Cross-platform thread correlation and relay protocol for sync-bot.
//!
//! A pull-request thread and a Slack thread are linked by a correlation token
//! written into text the two platforms already store: a marker line in the
//! pull-request body and the header `block_id` of the root Slack message.
//! Nothing else is persisted, so every routing decision is re-derived from
//! those two surfaces when an event arrives.

pub mod correlation_token;
pub mod event_classifier;
pub mod message_layout;
pub mod platform_api;
pub mod relay_config;
pub mod relay_engine;
pub mod relay_event;
pub mod repo_ref;
pub mod time_utils;

pub use correlation_token::{
    decode_from_chat_identifier, decode_from_review_body, encode_for_chat_identifier,
    encode_for_review_body, ChatThreadLink, CorrelationToken,
};
pub use event_classifier::{
    classify_chat_message, classify_review_event, IgnoreReason, RelayDecision,
};
pub use platform_api::{
    ChatApi, ChatPostMessage, ChatPostedMessage, ChatThreadRoot, ChatUserProfile, RelayError,
    ReviewApi,
};
pub use relay_config::RelayConfig;
pub use relay_engine::{RelayEngine, RelayOutcome};
pub use relay_event::{
    ActorKind, ChatMessagePosted, CommentAdded, EventOrigin, ReviewEvent, SubmissionOpened,
};
pub use repo_ref::RepoRef;
pub use time_utils::current_unix_timestamp;

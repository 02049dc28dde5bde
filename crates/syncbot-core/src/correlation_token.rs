//! Encoding and decoding of the link between a pull request and a Slack thread.
//!
//! The review side carries a single marker line prepended to the pull-request
//! body; the chat side carries `<pr_number>;<owner>/<repo>` in the root
//! message's header `block_id`.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::repo_ref::RepoRef;

pub const REVIEW_MARKER_PREFIX: &str = "<!-- DO NOT REMOVE | $SLACK_THREAD:";
pub const REVIEW_MARKER_SUFFIX: &str = " -->";
const CHAT_IDENTIFIER_SEPARATOR: char = ';';

fn review_marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^.+\$SLACK_THREAD:([A-Z0-9]+);([0-9]+\.[0-9]+)")
            .expect("review marker pattern must compile")
    })
}

/// Identifies the Slack thread linked to a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationToken {
    pub channel_id: String,
    pub thread_ts: String,
}

impl CorrelationToken {
    pub fn new(channel_id: impl Into<String>, thread_ts: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            thread_ts: thread_ts.into(),
        }
    }

    pub fn marker_line(&self) -> String {
        format!(
            "{REVIEW_MARKER_PREFIX}{};{}{REVIEW_MARKER_SUFFIX}",
            self.channel_id, self.thread_ts
        )
    }
}

/// Identifies the pull request linked to a Slack thread root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatThreadLink {
    pub pr_number: u64,
    pub repo: RepoRef,
}

/// Prepends the marker line for `token` to `original_body`.
///
/// The body is kept verbatim below the marker. This does not check for an
/// existing marker; callers must run [`decode_from_review_body`] first.
pub fn encode_for_review_body(token: &CorrelationToken, original_body: &str) -> String {
    format!("{}\n{original_body}", token.marker_line())
}

/// Returns the token from the first body line that carries a marker.
pub fn decode_from_review_body(body: &str) -> Option<CorrelationToken> {
    body.lines().find_map(|line| {
        let captures = review_marker_pattern().captures(line)?;
        Some(CorrelationToken::new(
            captures.get(1)?.as_str(),
            captures.get(2)?.as_str(),
        ))
    })
}

pub fn encode_for_chat_identifier(pr_number: u64, repo_full_name: &str) -> String {
    format!("{pr_number}{CHAT_IDENTIFIER_SEPARATOR}{repo_full_name}")
}

pub fn decode_from_chat_identifier(identifier: &str) -> Option<ChatThreadLink> {
    let (number, repo) = identifier.trim().split_once(CHAT_IDENTIFIER_SEPARATOR)?;
    let pr_number = number.trim().parse::<u64>().ok().filter(|value| *value > 0)?;
    let repo = RepoRef::parse(repo).ok()?;
    Some(ChatThreadLink { pr_number, repo })
}

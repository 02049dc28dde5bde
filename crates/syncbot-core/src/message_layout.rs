//! Slack message layouts and relay attribution text.

use serde_json::{json, Value};

use crate::correlation_token::encode_for_chat_identifier;
use crate::relay_event::SubmissionOpened;

pub const GITHUB_ATTRIBUTION_PREFIX: &str = "[Github]";
pub const SLACK_ATTRIBUTION_PREFIX: &str = "[Slack]";
const SUBMISSION_HEADER: &str = "New Game Submission :tada:";
/// Gallery entries are named after the prefixed title.
const GALLERY_TITLE_PREFIX: &str = "Sprig Game Submission - ";
const SUBMISSION_CALL_TO_ACTION: &str = "Want to participate and help in review by contributing?";
/// Slack rejects section text longer than this with `invalid_blocks`.
pub const SECTION_TEXT_MAX_CHARS: usize = 3000;

pub fn submission_title(submission: &SubmissionOpened) -> String {
    format!("[#{}] {}", submission.number, submission.title.trim())
}

pub fn submission_fallback_text(submission: &SubmissionOpened) -> String {
    format!("New submission {}", submission_title(submission))
}

pub fn preview_url(preview_base_url: &str, submission: &SubmissionOpened) -> String {
    format!(
        "{}/gallery/{}?pr={}",
        preview_base_url.trim_end_matches('/'),
        urlencoding::encode(&format!("{GALLERY_TITLE_PREFIX}{}", submission.title.trim())),
        submission.number
    )
}

/// Blocks for the thread root; the header `block_id` carries the thread link.
pub fn render_submission_blocks(
    submission: &SubmissionOpened,
    preview_base_url: Option<&str>,
) -> Value {
    let block_id =
        encode_for_chat_identifier(submission.number, &submission.repository.as_slug());
    let mut buttons = vec![json!({
        "type": "button",
        "text": {"type": "plain_text", "text": "View PR", "emoji": true},
        "url": submission.html_url,
    })];
    if let Some(base) = preview_base_url.map(str::trim).filter(|base| !base.is_empty()) {
        buttons.push(json!({
            "type": "button",
            "text": {"type": "plain_text", "text": "Play Preview", "emoji": true},
            "url": preview_url(base, submission),
        }));
    }

    json!([
        {
            "type": "header",
            "block_id": block_id,
            "text": {"type": "plain_text", "text": SUBMISSION_HEADER, "emoji": true},
        },
        {
            "type": "section",
            "text": {"type": "mrkdwn", "text": format!("*Title*: {}", submission_title(submission))},
        },
        {
            "type": "section",
            "text": {"type": "mrkdwn", "text": SUBMISSION_CALL_TO_ACTION},
        },
        {
            "type": "actions",
            "elements": buttons,
        },
    ])
}

pub fn render_description_blocks(description: &str) -> Value {
    let mut blocks = vec![json!({
        "type": "section",
        "text": {"type": "mrkdwn", "text": "*Description*: "},
    })];
    // Slack rejects empty section text.
    if !description.trim().is_empty() {
        blocks.extend(
            split_section_text(description, SECTION_TEXT_MAX_CHARS)
                .into_iter()
                .map(|chunk| {
                    json!({
                        "type": "section",
                        "text": {"type": "mrkdwn", "text": chunk},
                    })
                }),
        );
    }
    Value::Array(blocks)
}

/// Splits `text` into chunks of at most `max_chars` characters, breaking after
/// the last newline in a window when there is one.
fn split_section_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.chars().count() > max_chars {
        let window_end = rest
            .char_indices()
            .nth(max_chars)
            .map(|(index, _)| index)
            .unwrap_or(rest.len());
        let split_at = match rest[..window_end].rfind('\n') {
            Some(newline) if newline > 0 => newline + 1,
            _ => window_end,
        };
        let chunk = &rest[..split_at];
        if !chunk.trim().is_empty() {
            chunks.push(chunk.to_string());
        }
        rest = &rest[split_at..];
    }
    if !rest.trim().is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

pub fn description_fallback_text(description: &str) -> String {
    if description.trim().is_empty() {
        "Submission description: (none)".to_string()
    } else {
        format!("Submission description: {description}")
    }
}

pub fn render_github_relay_text(actor_login: &str, comment_body: &str) -> String {
    format!("{GITHUB_ATTRIBUTION_PREFIX} {actor_login}: {comment_body}")
}

pub fn render_slack_relay_text(display_name: &str, message_text: &str) -> String {
    format!("{SLACK_ATTRIBUTION_PREFIX} {display_name}: {message_text}")
}

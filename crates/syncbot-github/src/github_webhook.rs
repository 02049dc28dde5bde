//! GitHub webhook verification and payload normalization.

use anyhow::{anyhow, bail, Context, Result};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use syncbot_core::{ActorKind, CommentAdded, RepoRef, ReviewEvent, SubmissionOpened};

pub const GITHUB_EVENT_HEADER: &str = "x-github-event";
pub const GITHUB_SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const GITHUB_DELIVERY_HEADER: &str = "x-github-delivery";

pub fn verify_sha256_hmac_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
) -> Result<()> {
    let digest_hex = signature_header
        .trim()
        .strip_prefix("sha256=")
        .ok_or_else(|| anyhow!("signature must use sha256=<hex> format"))?;
    let signature_bytes = decode_hex(digest_hex)?;
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .context("failed to initialize hmac verifier")?;
    mac.update(payload);
    mac.verify_slice(&signature_bytes)
        .map_err(|_| anyhow!("signature verification failed"))
}

fn decode_hex(raw: &str) -> Result<Vec<u8>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("signature digest cannot be empty");
    }
    if !trimmed.is_ascii() || trimmed.len() % 2 != 0 {
        bail!("signature digest must be an even number of hex characters");
    }
    trimmed
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let chunk = std::str::from_utf8(pair).unwrap_or_default();
            u8::from_str_radix(chunk, 16)
                .with_context(|| format!("invalid hex byte '{chunk}' in signature digest"))
        })
        .collect()
}

/// Signature header value for `payload`, in the form GitHub sends.
pub fn sign_payload(payload: &[u8], secret: &str) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .context("failed to initialize hmac signer")?;
    mac.update(payload);
    let digest = mac.finalize().into_bytes();
    let hex = digest
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>();
    Ok(format!("sha256={hex}"))
}

#[derive(Debug, Deserialize)]
struct GithubRepositoryPayload {
    full_name: String,
}

impl GithubRepositoryPayload {
    fn repo_ref(&self) -> Result<RepoRef> {
        RepoRef::parse(&self.full_name).map_err(|error| anyhow!(error))
    }
}

#[derive(Debug, Deserialize)]
struct GithubUserPayload {
    login: String,
    #[serde(rename = "type", default)]
    user_type: String,
}

#[derive(Debug, Deserialize)]
struct GithubLabelPayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GithubPullRequestPayload {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestEventPayload {
    action: String,
    #[serde(default)]
    label: Option<GithubLabelPayload>,
    pull_request: GithubPullRequestPayload,
    repository: GithubRepositoryPayload,
}

#[derive(Debug, Deserialize)]
struct GithubIssuePayload {
    number: u64,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubCommentPayload {
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssueCommentEventPayload {
    action: String,
    issue: GithubIssuePayload,
    comment: GithubCommentPayload,
    sender: GithubUserPayload,
    repository: GithubRepositoryPayload,
}

/// Normalizes a webhook delivery.
///
/// Returns `Ok(None)` for events and actions the relay does not act on, and
/// an error when a handled event carries a malformed payload.
pub fn parse_github_webhook(event_name: &str, body: &[u8]) -> Result<Option<ReviewEvent>> {
    match event_name.trim() {
        "pull_request" => {
            let payload: PullRequestEventPayload =
                serde_json::from_slice(body).context("failed to decode pull_request payload")?;
            if payload.action != "labeled" {
                return Ok(None);
            }
            let Some(label) = payload.label else {
                return Ok(None);
            };
            Ok(Some(ReviewEvent::SubmissionOpened(SubmissionOpened {
                label: label.name,
                number: payload.pull_request.number,
                title: payload.pull_request.title,
                body: payload.pull_request.body.unwrap_or_default(),
                html_url: payload.pull_request.html_url,
                repository: payload.repository.repo_ref()?,
            })))
        }
        "issue_comment" => {
            let payload: IssueCommentEventPayload =
                serde_json::from_slice(body).context("failed to decode issue_comment payload")?;
            if payload.action != "created" {
                return Ok(None);
            }
            Ok(Some(ReviewEvent::CommentAdded(CommentAdded {
                actor_kind: ActorKind::from_github_sender_type(&payload.sender.user_type),
                actor_login: payload.sender.login,
                repository: payload.repository.repo_ref()?,
                number: payload.issue.number,
                thread_body: payload.issue.body.unwrap_or_default(),
                comment_body: payload.comment.body.unwrap_or_default(),
            })))
        }
        _ => Ok(None),
    }
}

//! GitHub REST client for the pull-request calls the relay makes.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use syncbot_core::RepoRef;

pub const GITHUB_API_VERSION: &str = "2022-11-28";
pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = "sync-bot";

#[derive(Debug, Clone, Deserialize)]
pub struct GithubPullRequestUpdateResponse {
    pub number: u64,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubCommentCreateResponse {
    pub id: u64,
    pub html_url: Option<String>,
}

pub fn truncate_for_error(raw: &str, max_chars: usize) -> String {
    if raw.chars().count() <= max_chars {
        return raw.to_string();
    }
    let truncated = raw.chars().take(max_chars).collect::<String>();
    format!("{truncated}...")
}

pub(crate) fn github_http_client(
    token: Option<&str>,
    request_timeout_ms: u64,
) -> Result<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(USER_AGENT),
    );
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static(GITHUB_ACCEPT),
    );
    headers.insert(
        "x-github-api-version",
        reqwest::header::HeaderValue::from_static(GITHUB_API_VERSION),
    );
    if let Some(token) = token {
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid github authorization header")?,
        );
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_millis(request_timeout_ms.max(1)))
        .build()
        .context("failed to create github api client")
}

/// Sends one request and decodes a successful JSON response. Never retries.
pub(crate) async fn send_github_json<T>(
    operation: &str,
    request: reqwest::RequestBuilder,
) -> Result<T>
where
    T: DeserializeOwned,
{
    let response = request
        .send()
        .await
        .with_context(|| format!("github api {operation} request failed"))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!(
            "github api {operation} failed with status {}: {}",
            status.as_u16(),
            truncate_for_error(&body, 800)
        );
    }
    response
        .json::<T>()
        .await
        .with_context(|| format!("failed to decode github {operation}"))
}

#[derive(Clone)]
/// Client bound to one installation or personal token.
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
}

impl GithubApiClient {
    pub fn new(api_base: &str, token: &str, request_timeout_ms: u64) -> Result<Self> {
        Ok(Self {
            http: github_http_client(Some(token), request_timeout_ms)?,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub async fn update_pull_request_body(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<GithubPullRequestUpdateResponse> {
        let payload = json!({ "body": body });
        send_github_json(
            "update pull request",
            self.http
                .patch(format!(
                    "{}/repos/{}/{}/pulls/{}",
                    self.api_base, repo.owner, repo.name, number
                ))
                .json(&payload),
        )
        .await
    }

    pub async fn create_issue_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<GithubCommentCreateResponse> {
        let payload = json!({ "body": body });
        send_github_json(
            "create issue comment",
            self.http
                .post(format!(
                    "{}/repos/{}/{}/issues/{}/comments",
                    self.api_base, repo.owner, repo.name, number
                ))
                .json(&payload),
        )
        .await
    }
}

//! Hot-swappable GitHub client.
//!
//! The active [`GithubApiClient`] sits behind an `ArcSwap` so a credential
//! refresh becomes visible to the next call without locking in-flight ones.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use syncbot_core::{RelayError, RepoRef, ReviewApi};

use crate::github_api_client::GithubApiClient;
use crate::github_app_auth::GithubInstallationTokenMinter;

#[derive(Clone)]
pub enum GithubCredentialSource {
    /// Fixed token; refresh rebuilds the client with the same token.
    StaticToken(String),
    App(GithubInstallationTokenMinter),
}

impl GithubCredentialSource {
    pub fn mode(&self) -> &'static str {
        match self {
            Self::StaticToken(_) => "static_token",
            Self::App(_) => "github_app",
        }
    }

    async fn resolve_token(&self) -> Result<String> {
        match self {
            Self::StaticToken(token) => Ok(token.clone()),
            Self::App(minter) => Ok(minter.mint().await?.token),
        }
    }
}

pub struct GithubClientProvider {
    source: GithubCredentialSource,
    api_base: String,
    request_timeout_ms: u64,
    current: ArcSwap<GithubApiClient>,
    refreshes: AtomicU64,
}

impl GithubClientProvider {
    /// Resolves an initial credential. Fails if no client can be built.
    pub async fn connect(
        source: GithubCredentialSource,
        api_base: &str,
        request_timeout_ms: u64,
    ) -> Result<Self> {
        let token = source.resolve_token().await?;
        let client = GithubApiClient::new(api_base, &token, request_timeout_ms)?;
        Ok(Self::with_client(source, api_base, request_timeout_ms, client))
    }

    /// Starts from an already-built client without resolving a credential.
    pub fn with_client(
        source: GithubCredentialSource,
        api_base: &str,
        request_timeout_ms: u64,
        client: GithubApiClient,
    ) -> Self {
        Self {
            source,
            api_base: api_base.trim_end_matches('/').to_string(),
            request_timeout_ms,
            current: ArcSwap::from_pointee(client),
            refreshes: AtomicU64::new(0),
        }
    }

    pub fn current(&self) -> Arc<GithubApiClient> {
        self.current.load_full()
    }

    pub fn source(&self) -> &GithubCredentialSource {
        &self.source
    }

    /// Number of successful refreshes since `connect`.
    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Mints a new credential and swaps it in. On failure the previous
    /// client stays active.
    pub async fn refresh(&self) -> Result<()> {
        let token = self.source.resolve_token().await?;
        let client = GithubApiClient::new(&self.api_base, &token, self.request_timeout_ms)?;
        self.current.store(Arc::new(client));
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        tracing::info!(mode = self.source.mode(), "github credential refreshed");
        Ok(())
    }
}

#[async_trait]
impl ReviewApi for GithubClientProvider {
    async fn update_pull_request_body(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<(), RelayError> {
        self.current()
            .update_pull_request_body(repo, number, body)
            .await
            .map(|_| ())
            .map_err(|error| RelayError::upstream("github update pull request", format!("{error:#}")))
    }

    async fn create_issue_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<(), RelayError> {
        self.current()
            .create_issue_comment(repo, number, body)
            .await
            .map(|_| ())
            .map_err(|error| RelayError::upstream("github create comment", format!("{error:#}")))
    }
}

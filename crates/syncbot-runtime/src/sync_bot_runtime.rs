//! Process wiring: builds the platform clients and runs every ingress stream
//! until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use syncbot_core::{RelayConfig, RelayEngine, RepoRef};
use syncbot_github::{
    GithubAppCredentials, GithubClientProvider, GithubCredentialSource,
    GithubInstallationTokenMinter,
};
use syncbot_slack::{run_socket_mode, SlackApiClient};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::credential_refresh::run_credential_refresh;
use crate::webhook_server::{build_webhook_router, WebhookServerState};

#[derive(Clone)]
pub enum GithubCredentialConfig {
    App {
        app_id: String,
        /// PEM private key, base64 encoded.
        private_key_base64: String,
    },
    Token(String),
}

impl std::fmt::Debug for GithubCredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::App { app_id, .. } => f
                .debug_struct("App")
                .field("app_id", app_id)
                .field("private_key_base64", &"<redacted>")
                .finish(),
            Self::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
        }
    }
}

#[derive(Clone)]
/// Runtime configuration for the relay process.
pub struct SyncBotRuntimeConfig {
    pub bind: String,
    pub webhook_path: String,
    pub webhook_secret: String,
    pub github_repo: RepoRef,
    pub github_api_base: String,
    pub github_credentials: GithubCredentialConfig,
    pub github_refresh_interval: Duration,
    pub slack_api_base: String,
    pub slack_app_token: String,
    pub slack_bot_token: String,
    pub slack_bot_user_id: Option<String>,
    pub slack_channel: String,
    pub slack_root_author_id: Option<String>,
    pub submission_label: String,
    pub preview_base_url: Option<String>,
    pub request_timeout_ms: u64,
    pub socket_reconnect_delay: Duration,
}

impl std::fmt::Debug for SyncBotRuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncBotRuntimeConfig")
            .field("bind", &self.bind)
            .field("webhook_path", &self.webhook_path)
            .field("webhook_secret", &"<redacted>")
            .field("github_repo", &self.github_repo)
            .field("github_api_base", &self.github_api_base)
            .field("github_credentials", &self.github_credentials)
            .field("github_refresh_interval", &self.github_refresh_interval)
            .field("slack_api_base", &self.slack_api_base)
            .field("slack_app_token", &"<redacted>")
            .field("slack_bot_token", &"<redacted>")
            .field("slack_bot_user_id", &self.slack_bot_user_id)
            .field("slack_channel", &self.slack_channel)
            .field("slack_root_author_id", &self.slack_root_author_id)
            .field("submission_label", &self.submission_label)
            .field("preview_base_url", &self.preview_base_url)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("socket_reconnect_delay", &self.socket_reconnect_delay)
            .finish()
    }
}

fn credential_source(config: &SyncBotRuntimeConfig) -> Result<GithubCredentialSource> {
    match &config.github_credentials {
        GithubCredentialConfig::Token(token) => {
            Ok(GithubCredentialSource::StaticToken(token.clone()))
        }
        GithubCredentialConfig::App {
            app_id,
            private_key_base64,
        } => {
            let credentials = GithubAppCredentials::from_base64_pem(app_id, private_key_base64)?;
            let minter = GithubInstallationTokenMinter::new(
                &config.github_api_base,
                config.github_repo.clone(),
                credentials,
                config.request_timeout_ms,
            )?;
            Ok(GithubCredentialSource::App(minter))
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub async fn run_sync_bot(config: SyncBotRuntimeConfig) -> Result<()> {
    let source = credential_source(&config)?;
    let refreshes_credential = matches!(source, GithubCredentialSource::App(_));
    let github = Arc::new(
        GithubClientProvider::connect(source, &config.github_api_base, config.request_timeout_ms)
            .await
            .context("failed to acquire initial github credential")?,
    );

    let slack = SlackApiClient::new(
        &config.slack_api_base,
        &config.slack_app_token,
        &config.slack_bot_token,
        config.request_timeout_ms,
    )?;
    let bot_user_id = match non_empty(config.slack_bot_user_id.as_ref()) {
        Some(user_id) => user_id,
        None => slack
            .resolve_bot_user_id()
            .await
            .context("failed to resolve slack bot user id")?,
    };
    let root_author_id =
        non_empty(config.slack_root_author_id.as_ref()).unwrap_or_else(|| bot_user_id.clone());

    let relay_config = RelayConfig {
        submission_label: config.submission_label.trim().to_string(),
        chat_channel: config.slack_channel.trim().to_string(),
        root_author_id,
        bot_user_id,
        preview_base_url: non_empty(config.preview_base_url.as_ref()),
    };
    let engine = RelayEngine::new(relay_config, Arc::new(slack.clone()), github.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("failed to listen for ctrl-c; shutting down");
        }
        info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    let listener = TcpListener::bind(config.bind.as_str())
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve webhook bound address")?;
    info!(
        addr = %local_addr,
        path = %config.webhook_path,
        repo = %config.github_repo,
        channel = %engine.config().chat_channel,
        github_mode = github.source().mode(),
        "sync-bot webhook server listening"
    );

    let socket_task = tokio::spawn(run_socket_mode(
        slack,
        engine.clone(),
        config.socket_reconnect_delay,
        shutdown_rx.clone(),
    ));
    let refresh_task = refreshes_credential.then(|| {
        tokio::spawn(run_credential_refresh(
            github.clone(),
            config.github_refresh_interval,
            shutdown_rx.clone(),
        ))
    });

    let app = build_webhook_router(
        Arc::new(WebhookServerState {
            engine,
            webhook_secret: config.webhook_secret.clone(),
        }),
        &config.webhook_path,
    );
    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .context("sync-bot webhook server exited unexpectedly")?;

    socket_task
        .await
        .context("slack socket task panicked")?
        .context("slack socket loop failed")?;
    if let Some(refresh_task) = refresh_task {
        refresh_task
            .await
            .context("credential refresh task panicked")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use syncbot_core::RepoRef;

    use super::{GithubCredentialConfig, SyncBotRuntimeConfig};

    fn config(github_credentials: GithubCredentialConfig) -> SyncBotRuntimeConfig {
        SyncBotRuntimeConfig {
            bind: "127.0.0.1:3000".to_string(),
            webhook_path: "/api/github/webhooks".to_string(),
            webhook_secret: "whsec-hidden".to_string(),
            github_repo: RepoRef::new("org", "repo"),
            github_api_base: "https://api.github.com".to_string(),
            github_credentials,
            github_refresh_interval: Duration::from_secs(58 * 60),
            slack_api_base: "https://slack.com/api".to_string(),
            slack_app_token: "xapp-hidden".to_string(),
            slack_bot_token: "xoxb-hidden".to_string(),
            slack_bot_user_id: None,
            slack_channel: "CSUB".to_string(),
            slack_root_author_id: None,
            submission_label: "submission".to_string(),
            preview_base_url: None,
            request_timeout_ms: 10_000,
            socket_reconnect_delay: Duration::from_secs(5),
        }
    }

    #[test]
    fn regression_debug_output_redacts_secrets() {
        let app = format!(
            "{:?}",
            config(GithubCredentialConfig::App {
                app_id: "123".to_string(),
                private_key_base64: "pem-hidden".to_string(),
            })
        );
        let token = format!("{:?}", config(GithubCredentialConfig::Token("ghp-hidden".to_string())));
        for rendered in [&app, &token] {
            assert!(!rendered.contains("hidden"), "{rendered}");
            assert!(rendered.contains("<redacted>"));
            assert!(rendered.contains("CSUB"));
        }
        assert!(app.contains("app_id: \"123\""));
    }
}

use std::time::Duration;

use anyhow::{bail, Result};
use syncbot_core::RepoRef;
use syncbot_runtime::{GithubCredentialConfig, SyncBotRuntimeConfig};

use crate::cli_args::Cli;

fn resolve_non_empty_cli_value(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn require(value: Option<&str>, flag: &str) -> Result<String> {
    match resolve_non_empty_cli_value(value) {
        Some(value) => Ok(value),
        None => bail!("{flag} is required"),
    }
}

/// Applies `--port` to the host part of `--bind`.
fn resolve_bind(bind: &str, port: Option<u16>) -> String {
    let bind = bind.trim();
    match port {
        Some(port) => {
            let host = bind.rsplit_once(':').map(|(host, _)| host).unwrap_or(bind);
            format!("{host}:{port}")
        }
        None => bind.to_string(),
    }
}

fn resolve_github_credentials(cli: &Cli) -> Result<GithubCredentialConfig> {
    let app_id = resolve_non_empty_cli_value(cli.github_app_id.as_deref());
    let private_key = resolve_non_empty_cli_value(cli.github_app_private_key.as_deref());
    let token = resolve_non_empty_cli_value(cli.github_token.as_deref());

    match (app_id, private_key, token) {
        (Some(_), Some(_), Some(_)) => {
            bail!("--github-token cannot be combined with --github-app-id/--github-app-private-key")
        }
        (Some(app_id), Some(private_key_base64), None) => Ok(GithubCredentialConfig::App {
            app_id,
            private_key_base64,
        }),
        (Some(_), None, _) | (None, Some(_), _) => {
            bail!("--github-app-id and --github-app-private-key must be set together")
        }
        (None, None, Some(token)) => Ok(GithubCredentialConfig::Token(token)),
        (None, None, None) => bail!(
            "github credentials are required: set --github-app-id with --github-app-private-key, or --github-token"
        ),
    }
}

pub(crate) fn build_runtime_config(cli: &Cli) -> Result<SyncBotRuntimeConfig> {
    let webhook_secret = require(cli.webhook_secret.as_deref(), "--webhook-secret")?;
    let github_repo = RepoRef::parse(&require(cli.github_repo.as_deref(), "--github-repo")?)?;
    let github_credentials = resolve_github_credentials(cli)?;
    let slack_app_token = require(cli.slack_app_token.as_deref(), "--slack-app-token")?;
    let slack_bot_token = require(cli.slack_bot_token.as_deref(), "--slack-bot-token")?;
    let slack_channel = require(cli.slack_channel.as_deref(), "--slack-channel")?;
    let submission_label = require(cli.submission_label.as_deref(), "--submission-label")?;

    Ok(SyncBotRuntimeConfig {
        bind: resolve_bind(&cli.bind, cli.port),
        webhook_path: cli.webhook_path.clone(),
        webhook_secret,
        github_repo,
        github_api_base: cli.github_api_base.trim().to_string(),
        github_credentials,
        github_refresh_interval: Duration::from_secs(cli.github_token_refresh_minutes.saturating_mul(60)),
        slack_api_base: cli.slack_api_base.trim().to_string(),
        slack_app_token,
        slack_bot_token,
        slack_bot_user_id: resolve_non_empty_cli_value(cli.slack_bot_user_id.as_deref()),
        slack_channel,
        slack_root_author_id: resolve_non_empty_cli_value(cli.slack_root_author_id.as_deref()),
        submission_label,
        preview_base_url: resolve_non_empty_cli_value(cli.preview_base_url.as_deref()),
        request_timeout_ms: cli.request_timeout_ms,
        socket_reconnect_delay: Duration::from_millis(cli.socket_reconnect_delay_ms),
    })
}

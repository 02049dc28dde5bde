use clap::Parser;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_webhook_path(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if !trimmed.starts_with('/') || trimmed.len() < 2 {
        return Err("webhook path must start with '/' and name a route".to_string());
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Parser)]
#[command(
    name = "sync-bot",
    about = "Relays conversation between labeled GitHub pull requests and Slack threads",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "SYNC_BOT_BIND",
        default_value = "0.0.0.0:3000",
        help = "Socket address for the GitHub webhook server"
    )]
    pub bind: String,

    #[arg(
        long,
        env = "PORT",
        help = "Port override applied to --bind"
    )]
    pub port: Option<u16>,

    #[arg(
        long = "webhook-path",
        env = "SYNC_BOT_WEBHOOK_PATH",
        default_value = "/api/github/webhooks",
        value_parser = parse_webhook_path,
        help = "Route that receives GitHub webhook deliveries"
    )]
    pub webhook_path: String,

    #[arg(
        long = "webhook-secret",
        env = "WEBHOOK_SECRET",
        hide_env_values = true,
        help = "Shared secret used to verify x-hub-signature-256"
    )]
    pub webhook_secret: Option<String>,

    #[arg(
        long = "github-repo",
        env = "GH_REPO",
        help = "Repository in owner/repo form used to locate the app installation"
    )]
    pub github_repo: Option<String>,

    #[arg(
        long = "github-api-base",
        env = "SYNC_BOT_GITHUB_API_BASE",
        default_value = "https://api.github.com",
        help = "GitHub REST API base URL"
    )]
    pub github_api_base: String,

    #[arg(long = "github-app-id", env = "GH_APP_ID", help = "GitHub App id")]
    pub github_app_id: Option<String>,

    #[arg(
        long = "github-app-private-key",
        env = "GH_APP_PRIVATE",
        hide_env_values = true,
        help = "GitHub App private key PEM, base64 encoded"
    )]
    pub github_app_private_key: Option<String>,

    #[arg(
        long = "github-token",
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        help = "Static GitHub token used instead of app credentials"
    )]
    pub github_token: Option<String>,

    #[arg(
        long = "github-token-refresh-minutes",
        env = "SYNC_BOT_GITHUB_TOKEN_REFRESH_MINUTES",
        default_value_t = 58,
        value_parser = parse_positive_u64,
        help = "Minutes between GitHub App installation token refreshes"
    )]
    pub github_token_refresh_minutes: u64,

    #[arg(
        long = "slack-api-base",
        env = "SYNC_BOT_SLACK_API_BASE",
        default_value = "https://slack.com/api",
        help = "Slack Web API base URL"
    )]
    pub slack_api_base: String,

    #[arg(
        long = "slack-app-token",
        env = "SLACK_APP_TOKEN",
        hide_env_values = true,
        help = "Slack app-level token for Socket Mode"
    )]
    pub slack_app_token: Option<String>,

    #[arg(
        long = "slack-bot-token",
        env = "SLACK_BOT_TOKEN",
        hide_env_values = true,
        help = "Slack bot token for Web API calls"
    )]
    pub slack_bot_token: Option<String>,

    #[arg(
        long = "slack-bot-user-id",
        env = "SLACK_BOT_USER_ID",
        help = "Slack bot user id; resolved with auth.test when omitted"
    )]
    pub slack_bot_user_id: Option<String>,

    #[arg(
        long = "slack-channel",
        env = "SLACK_CHANNEL",
        help = "Slack channel that receives submission threads"
    )]
    pub slack_channel: Option<String>,

    #[arg(
        long = "slack-root-author-id",
        env = "SLACK_ROOT_AUTHOR_ID",
        help = "User id that authors submission thread roots; defaults to the bot user"
    )]
    pub slack_root_author_id: Option<String>,

    #[arg(
        long = "submission-label",
        env = "PR_LABEL",
        help = "Pull request label that opens a Slack thread"
    )]
    pub submission_label: Option<String>,

    #[arg(
        long = "preview-base-url",
        env = "SPRIG_URL",
        help = "Base URL for the submission preview button"
    )]
    pub preview_base_url: Option<String>,

    #[arg(
        long = "request-timeout-ms",
        env = "SYNC_BOT_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Per-request timeout for GitHub and Slack API calls"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "socket-reconnect-delay-ms",
        env = "SYNC_BOT_SOCKET_RECONNECT_DELAY_MS",
        default_value_t = 5_000,
        value_parser = parse_positive_u64,
        help = "Delay before reopening a closed Slack Socket Mode session"
    )]
    pub socket_reconnect_delay_ms: u64,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::Cli;

    /// Declared default of an argument, independent of the process environment.
    fn declared_default(id: &str) -> Option<String> {
        let command = Cli::command();
        let arg = command
            .get_arguments()
            .find(|arg| arg.get_id().as_str() == id)
            .expect("argument");
        arg.get_default_values()
            .first()
            .map(|value| value.to_string_lossy().into_owned())
    }

    #[test]
    fn unit_defaults_match_documented_values() {
        for (id, expected) in [
            ("bind", "0.0.0.0:3000"),
            ("webhook_path", "/api/github/webhooks"),
            ("github_token_refresh_minutes", "58"),
            ("github_api_base", "https://api.github.com"),
            ("slack_api_base", "https://slack.com/api"),
            ("request_timeout_ms", "10000"),
            ("socket_reconnect_delay_ms", "5000"),
        ] {
            assert_eq!(declared_default(id).as_deref(), Some(expected), "{id}");
        }
        assert_eq!(declared_default("port"), None);
        assert_eq!(declared_default("submission_label"), None);
    }

    #[test]
    fn unit_explicit_flags_take_precedence_over_environment() {
        let cli = Cli::try_parse_from([
            "sync-bot",
            "--bind",
            "127.0.0.1:4000",
            "--request-timeout-ms",
            "250",
        ])
        .expect("parse");
        assert_eq!(cli.bind, "127.0.0.1:4000");
        assert_eq!(cli.request_timeout_ms, 250);
    }

    #[test]
    fn regression_zero_durations_and_bad_paths_are_rejected() {
        assert!(Cli::try_parse_from(["sync-bot", "--request-timeout-ms", "0"]).is_err());
        assert!(Cli::try_parse_from(["sync-bot", "--github-token-refresh-minutes", "0"]).is_err());
        assert!(Cli::try_parse_from(["sync-bot", "--webhook-path", "hooks"]).is_err());
        assert!(Cli::try_parse_from(["sync-bot", "--webhook-path", "/"]).is_err());
    }
}

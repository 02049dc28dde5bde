//! Dispatch loop for sync-bot: GitHub webhook server, Slack Socket Mode
//! session, and GitHub credential refresh, run side by side.

pub mod credential_refresh;
pub mod sync_bot_runtime;
pub mod webhook_server;

pub use credential_refresh::run_credential_refresh;
pub use sync_bot_runtime::{run_sync_bot, GithubCredentialConfig, SyncBotRuntimeConfig};
pub use webhook_server::{build_webhook_router, WebhookServerState, DEFAULT_WEBHOOK_PATH};

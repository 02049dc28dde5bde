//! GitHub side of sync-bot: REST client, app authentication, and webhook
//! ingestion.

pub mod github_api_client;
pub mod github_app_auth;
pub mod github_client_provider;
pub mod github_webhook;

pub use github_api_client::GithubApiClient;
pub use github_app_auth::{GithubAppCredentials, GithubInstallationTokenMinter};
pub use github_client_provider::{GithubClientProvider, GithubCredentialSource};
pub use github_webhook::{
    parse_github_webhook, sign_payload, verify_sha256_hmac_signature, GITHUB_DELIVERY_HEADER,
    GITHUB_EVENT_HEADER, GITHUB_SIGNATURE_HEADER,
};

//! GitHub App installation-token minting.
//!
//! An RS256 app assertion is exchanged for an installation access token in
//! two calls: the installation lookup for the configured repository, then a
//! POST to the returned `access_tokens_url`. Installation tokens live for one
//! hour.

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use syncbot_core::{current_unix_timestamp, RepoRef};

use crate::github_api_client::{github_http_client, send_github_json};

/// Back-dates `iat` to tolerate clock drift against GitHub.
const APP_JWT_CLOCK_SKEW_SECONDS: u64 = 60;
/// GitHub rejects app assertions that live longer than ten minutes.
const APP_JWT_LIFETIME_SECONDS: u64 = 9 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubAppClaims {
    pub iat: u64,
    pub exp: u64,
    pub iss: String,
}

#[derive(Clone)]
pub struct GithubAppCredentials {
    app_id: String,
    private_key: EncodingKey,
}

impl std::fmt::Debug for GithubAppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubAppCredentials")
            .field("app_id", &self.app_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl GithubAppCredentials {
    pub fn from_pem(app_id: &str, private_key_pem: &str) -> Result<Self> {
        let app_id = app_id.trim();
        if app_id.is_empty() {
            return Err(anyhow!("github app id cannot be empty"));
        }
        let private_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .context("github app private key is not a valid RSA PEM")?;
        Ok(Self {
            app_id: app_id.to_string(),
            private_key,
        })
    }

    /// Accepts the private key PEM as a single base64 string.
    pub fn from_base64_pem(app_id: &str, encoded_private_key: &str) -> Result<Self> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded_private_key.trim())
            .context("github app private key is not valid base64")?;
        let pem = String::from_utf8(decoded).context("github app private key is not utf-8")?;
        Self::from_pem(app_id, &pem)
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn claims_at(&self, now_unix: u64) -> GithubAppClaims {
        GithubAppClaims {
            iat: now_unix.saturating_sub(APP_JWT_CLOCK_SKEW_SECONDS),
            exp: now_unix.saturating_add(APP_JWT_LIFETIME_SECONDS),
            iss: self.app_id.clone(),
        }
    }

    pub fn app_jwt(&self, now_unix: u64) -> Result<String> {
        encode(
            &Header::new(Algorithm::RS256),
            &self.claims_at(now_unix),
            &self.private_key,
        )
        .context("failed to sign github app jwt")
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GithubInstallationResponse {
    id: u64,
    access_tokens_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubInstallationToken {
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Clone)]
/// Mints installation tokens for the app installed on one repository.
pub struct GithubInstallationTokenMinter {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
    credentials: GithubAppCredentials,
}

impl GithubInstallationTokenMinter {
    pub fn new(
        api_base: &str,
        repo: RepoRef,
        credentials: GithubAppCredentials,
        request_timeout_ms: u64,
    ) -> Result<Self> {
        Ok(Self {
            http: github_http_client(None, request_timeout_ms)?,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
            credentials,
        })
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub async fn mint(&self) -> Result<GithubInstallationToken> {
        let jwt = self.credentials.app_jwt(current_unix_timestamp())?;
        let installation: GithubInstallationResponse = send_github_json(
            "resolve app installation",
            self.http
                .get(format!(
                    "{}/repos/{}/{}/installation",
                    self.api_base, self.repo.owner, self.repo.name
                ))
                .bearer_auth(&jwt),
        )
        .await?;
        tracing::debug!(
            installation_id = installation.id,
            repo = %self.repo,
            "resolved github app installation"
        );

        let token: GithubInstallationToken = send_github_json(
            "create installation access token",
            self.http
                .post(installation.access_tokens_url.as_str())
                .bearer_auth(&jwt),
        )
        .await?;
        if token.token.trim().is_empty() {
            return Err(anyhow!("github installation access token response was empty"));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use httpmock::prelude::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use serde_json::json;
    use syncbot_core::RepoRef;

    use super::{GithubAppClaims, GithubAppCredentials, GithubInstallationTokenMinter};

    const TEST_PRIVATE_KEY: &str = include_str!("fixtures/test_app_private_key.pem");
    const TEST_PUBLIC_KEY: &str = include_str!("fixtures/test_app_public_key.pem");

    #[test]
    fn unit_claims_backdate_issue_time_and_stay_under_ten_minutes() {
        let credentials = GithubAppCredentials::from_pem("12345", TEST_PRIVATE_KEY).expect("creds");
        let claims = credentials.claims_at(1_000_000);
        assert_eq!(claims.iat, 999_940);
        assert_eq!(claims.exp, 1_000_540);
        assert_eq!(claims.iss, "12345");
    }

    #[test]
    fn functional_app_jwt_verifies_with_public_key() {
        let credentials = GithubAppCredentials::from_pem("12345", TEST_PRIVATE_KEY).expect("creds");
        let now = syncbot_core::current_unix_timestamp();
        let jwt = credentials.app_jwt(now).expect("jwt");

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iat", "iss"]);
        let decoded = decode::<GithubAppClaims>(
            &jwt,
            &DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).expect("public key"),
            &validation,
        )
        .expect("decode");
        assert_eq!(decoded.claims.iss, "12345");
    }

    #[test]
    fn unit_base64_encoded_pem_is_accepted() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(TEST_PRIVATE_KEY);
        let credentials = GithubAppCredentials::from_base64_pem("7", &encoded).expect("creds");
        assert_eq!(credentials.app_id(), "7");
        assert!(format!("{credentials:?}").contains("<redacted>"));
    }

    #[test]
    fn regression_invalid_key_material_is_rejected() {
        assert!(GithubAppCredentials::from_pem("7", "not a key").is_err());
        assert!(GithubAppCredentials::from_base64_pem("7", "%%%").is_err());
        assert!(GithubAppCredentials::from_pem(" ", TEST_PRIVATE_KEY).is_err());
    }

    #[tokio::test]
    async fn integration_mint_resolves_installation_then_creates_token() {
        let server = MockServer::start();
        let installation = server.mock(|when, then| {
            when.method(GET).path("/repos/org/repo/installation");
            then.status(200).json_body(json!({
                "id": 77,
                "access_tokens_url": format!("{}/app/installations/77/access_tokens", server.base_url()),
            }));
        });
        let access_token = server.mock(|when, then| {
            when.method(POST).path("/app/installations/77/access_tokens");
            then.status(201).json_body(json!({
                "token": "ghs-minted",
                "expires_at": "2030-01-01T00:00:00Z",
            }));
        });

        let credentials = GithubAppCredentials::from_pem("12345", TEST_PRIVATE_KEY).expect("creds");
        let minter = GithubInstallationTokenMinter::new(
            &server.base_url(),
            RepoRef::new("org", "repo"),
            credentials,
            2_000,
        )
        .expect("minter");
        let token = minter.mint().await.expect("mint");
        assert_eq!(token.token, "ghs-minted");
        installation.assert();
        access_token.assert();
    }

    #[tokio::test]
    async fn regression_mint_fails_when_app_is_not_installed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/org/repo/installation");
            then.status(404).json_body(json!({"message": "Not Found"}));
        });
        let credentials = GithubAppCredentials::from_pem("12345", TEST_PRIVATE_KEY).expect("creds");
        let minter = GithubInstallationTokenMinter::new(
            &server.base_url(),
            RepoRef::new("org", "repo"),
            credentials,
            2_000,
        )
        .expect("minter");
        let error = minter.mint().await.expect_err("not installed");
        assert!(format!("{error:#}").contains("status 404"));
    }
}

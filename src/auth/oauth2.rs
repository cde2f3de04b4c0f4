//! OAuth2 client-credentials authentication.

use super::{AuthContext, AuthError, AuthProvider, FromAuthContext, SelfTest};
use crate::params::{DataType, ParamError, ParamSet, ParamSpec};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::OnceCell;

fn contract() -> (ParamSet, ParamSpec, ParamSpec, ParamSpec, ParamSpec) {
    let mut set = ParamSet::new();
    let token_url = set.required("OAUTH_TOKEN_URL", DataType::String, "OAuth token URL");
    let client_id = set.required("CLIENT_ID", DataType::String, "OAuth client ID");
    let client_secret = set.required("CLIENT_SECRET", DataType::String, "OAuth client secret");
    let scope = set.required("SCOPE", DataType::String, "OAuth scope (space-separated)");
    (set, token_url, client_id, client_secret, scope)
}

/// Token response from the identity endpoint (standard OAuth 2.0).
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchanges client credentials for a bearer token on first use.
///
/// The token is cached for the provider's lifetime and never refreshed:
/// providers are constructed per invocation, so the cache lives as long as
/// one connector call. Expiry is not checked.
#[derive(Debug)]
pub struct OAuth2ClientCredentials {
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    http_client: reqwest::Client,
    access_token: OnceCell<String>,
}

impl FromAuthContext for OAuth2ClientCredentials {
    fn from_context(ctx: &AuthContext) -> Result<Self, ParamError> {
        let (_, token_url, client_id, client_secret, scope) = contract();
        Ok(Self {
            token_url: token_url.read_string(ctx)?,
            client_id: client_id.read_string(ctx)?,
            client_secret: client_secret.read_string(ctx)?,
            scope: scope.read_string(ctx)?,
            http_client: reqwest::Client::new(),
            access_token: OnceCell::new(),
        })
    }
}

impl OAuth2ClientCredentials {
    /// One client-credentials token exchange. Not retried.
    async fn fetch_token(&self) -> Result<String, AuthError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        tracing::debug!(token_url = %self.token_url, "Acquiring client-credentials token");

        let response = self
            .http_client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::warn!(status, "Token endpoint rejected client credentials");
            return Err(AuthError::TokenEndpoint { status });
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        tracing::debug!(
            expires_in = ?token_response.expires_in,
            "Client-credentials token acquired"
        );

        token_response.access_token.ok_or(AuthError::TokenMissing)
    }

    async fn token(&self) -> Result<&str, AuthError> {
        self.access_token
            .get_or_try_init(|| self.fetch_token())
            .await
            .map(String::as_str)
    }
}

#[async_trait]
impl AuthProvider for OAuth2ClientCredentials {
    async fn headers(&self) -> Result<HashMap<String, String>, AuthError> {
        let token = self.token().await?;
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Ok(headers)
    }

    async fn self_test(&self) -> SelfTest {
        // The token exchange itself is the probe: a fresh 2xx with a token
        // proves the credentials.
        match self.fetch_token().await {
            Ok(_) => SelfTest::Passed,
            Err(e) => {
                tracing::warn!(error = %e, "OAuth2 self-test failed");
                SelfTest::AuthFailure
            }
        }
    }
}

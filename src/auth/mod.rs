//! Authentication providers.
//!
//! Each provider encapsulates one way a connector proves its identity to an
//! upstream API: it is constructed from a caller-owned [`AuthContext`],
//! produces outbound request headers, and can self-test the configured
//! credentials with exactly one lightweight probe request.
//!
//! The self-test outcome is a hard external contract consumed by a UI layer
//! that shows pass/fail to a human operator: it is one of 200/401/400 and
//! never carries exception text. Diagnostic detail goes to the tracing log.

use crate::params::ParamError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

mod api_key;
mod basic;
mod delegated;
mod oauth2;


pub use api_key::ApiKeyAuth;
pub use basic::Base64BasicAuth;
pub use delegated::DelegatedBasicAuth;
pub use oauth2::OAuth2ClientCredentials;

/// Connection parameters for one connector invocation.
///
/// Opaque mapping from connection-parameter names to raw values, owned by
/// the caller. Never persisted here.
pub type AuthContext = Map<String, Value>;

/// Self-test outcome reported to the operator UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelfTest {
    /// The probe request succeeded with a 2xx response.
    Passed,
    /// The upstream rejected the credentials, or the probe failed for any
    /// network/parse reason.
    AuthFailure,
    /// A required connection parameter was missing; no request was made.
    BadConfig,
}

impl SelfTest {
    /// The HTTP-style code the UI contract expects: 200, 401, or 400.
    pub fn status_code(&self) -> u16 {
        match self {
            SelfTest::Passed => 200,
            SelfTest::AuthFailure => 401,
            SelfTest::BadConfig => 400,
        }
    }
}

/// Errors raised while producing headers (token acquisition).
#[derive(Debug)]
pub enum AuthError {
    /// The identity endpoint returned a non-success status.
    TokenEndpoint { status: u16 },
    /// The token request could not be sent or its response not parsed.
    Transport(String),
    /// The identity endpoint answered 2xx but carried no access token.
    TokenMissing,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::TokenEndpoint { status } => {
                write!(f, "Token endpoint rejected the request with status {}", status)
            }
            AuthError::Transport(msg) => write!(f, "Token request failed: {}", msg),
            AuthError::TokenMissing => {
                write!(f, "Token endpoint response carried no access token")
            }
        }
    }
}

impl std::error::Error for AuthError {}

/// Construction half of the provider capability.
///
/// Reads all required connection parameters out of the context; a missing
/// required parameter is a configuration error surfaced before any network
/// call is attempted.
pub trait FromAuthContext: Sized {
    fn from_context(ctx: &AuthContext) -> Result<Self, ParamError>;
}

/// Provider capability: produce headers, self-test credentials.
///
/// Implementations are stateless apart from a lazily acquired bearer token,
/// which is scoped to one provider instance. Each invocation constructs its
/// own provider; nothing is shared across invocations.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Builds the outbound request headers.
    ///
    /// Token-based schemes acquire their bearer token here on first use and
    /// cache it for the provider's lifetime.
    async fn headers(&self) -> Result<HashMap<String, String>, AuthError>;

    /// Issues exactly one lightweight probe request with the provider's
    /// headers and maps the result to the self-test contract.
    async fn self_test(&self) -> SelfTest;
}

/// Applies a provider's headers to an outbound request.
pub fn apply_headers(
    mut request: reqwest::RequestBuilder,
    headers: &HashMap<String, String>,
) -> reqwest::RequestBuilder {
    for (name, value) in headers {
        request = request.header(name, value);
    }
    request
}

/// Maps a probe response to the self-test contract: 2xx passes, everything
/// else is an auth failure. Logs the status for diagnosis.
pub fn outcome_from_probe(result: Result<reqwest::Response, reqwest::Error>) -> SelfTest {
    match result {
        Ok(response) if response.status().is_success() => SelfTest::Passed,
        Ok(response) => {
            tracing::warn!(status = %response.status(), "Self-test probe rejected");
            SelfTest::AuthFailure
        }
        Err(e) => {
            tracing::warn!(error = %e, "Self-test probe failed to complete");
            SelfTest::AuthFailure
        }
    }
}

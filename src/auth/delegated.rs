//! Basic authentication delegated to the transport layer.
//!
//! Used by Splunk-style connectors: the username and password are handed to
//! reqwest's `basic_auth` on every request instead of being pre-encoded into
//! a header, and the headers themselves only carry the content type.

use super::{outcome_from_probe, AuthContext, AuthError, AuthProvider, FromAuthContext, SelfTest};
use crate::params::{DataType, ParamError, ParamSet, ParamSpec};
use async_trait::async_trait;
use std::collections::HashMap;

fn contract() -> (ParamSet, ParamSpec, ParamSpec, ParamSpec) {
    let mut set = ParamSet::new();
    let username = set.required("USERNAME", DataType::String, "Username");
    let password = set.required("PASSWORD", DataType::String, "Password");
    let base_url = set.required("BASE_URL", DataType::String, "Base URL");
    (set, username, password, base_url)
}

/// Credentials applied by the HTTP transport on each request.
pub struct DelegatedBasicAuth {
    username: String,
    password: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl DelegatedBasicAuth {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The `(username, password)` pair for `RequestBuilder::basic_auth`.
    pub fn credentials(&self) -> (&str, &str) {
        (&self.username, &self.password)
    }
}

impl FromAuthContext for DelegatedBasicAuth {
    fn from_context(ctx: &AuthContext) -> Result<Self, ParamError> {
        let (_, username, password, base_url) = contract();
        Ok(Self {
            username: username.read_string(ctx)?,
            password: password.read_string(ctx)?,
            base_url: base_url.read_string(ctx)?,
            http_client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl AuthProvider for DelegatedBasicAuth {
    async fn headers(&self) -> Result<HashMap<String, String>, AuthError> {
        let mut headers = HashMap::new();
        headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        Ok(headers)
    }

    async fn self_test(&self) -> SelfTest {
        // Probe by starting a trivial search job, the lightest authenticated
        // call the search API offers.
        let url = format!("{}/services/search/v2/jobs", self.base_url);
        let result = self
            .http_client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .form(&[("search", "search index=_internal | head 5")])
            .send()
            .await;
        outcome_from_probe(result)
    }
}

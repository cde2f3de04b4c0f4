//! Static bearer-token authentication.

use super::{outcome_from_probe, AuthContext, AuthError, AuthProvider, FromAuthContext, SelfTest};
use crate::params::{DataType, ParamError, ParamSet, ParamSpec};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;

/// Connection parameters for API-key connectors.
fn contract() -> (ParamSet, ParamSpec, ParamSpec) {
    let mut set = ParamSet::new();
    let api_url = set.required("API_URL", DataType::String, "Base API URL");
    let api_key = set.required("API_KEY", DataType::String, "API key/token");
    (set, api_url, api_key)
}

/// Authenticates with a static API key sent as a bearer token.
pub struct ApiKeyAuth {
    api_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl ApiKeyAuth {
    pub fn base_url(&self) -> &str {
        &self.api_url
    }
}

impl FromAuthContext for ApiKeyAuth {
    fn from_context(ctx: &AuthContext) -> Result<Self, ParamError> {
        let (_, api_url, api_key) = contract();
        Ok(Self {
            api_url: api_url.read_string(ctx)?,
            api_key: api_key.read_string(ctx)?,
            http_client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl AuthProvider for ApiKeyAuth {
    async fn headers(&self) -> Result<HashMap<String, String>, AuthError> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        );
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Ok(headers)
    }

    async fn self_test(&self) -> SelfTest {
        let url = format!("{}/auth", self.api_url);
        let result = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({}))
            .send()
            .await;
        outcome_from_probe(result)
    }
}

//! Base64-encoded basic authentication.

use super::{outcome_from_probe, AuthContext, AuthError, AuthProvider, FromAuthContext, SelfTest};
use crate::params::{DataType, ParamError, ParamSet, ParamSpec};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use std::collections::HashMap;

fn contract() -> (ParamSet, ParamSpec, ParamSpec, ParamSpec) {
    let mut set = ParamSet::new();
    let username = set.required("USERNAME", DataType::String, "Username");
    let password = set.required("PASSWORD", DataType::String, "Password");
    let base_url = set.required("BASE_URL", DataType::String, "Base URL");
    (set, username, password, base_url)
}

/// Authenticates by encoding `username:password` into a `Basic` header.
pub struct Base64BasicAuth {
    username: String,
    password: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl Base64BasicAuth {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn encoded_credentials(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.username, self.password))
    }
}

impl FromAuthContext for Base64BasicAuth {
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
impl AuthProvider for Base64BasicAuth {
    async fn headers(&self) -> Result<HashMap<String, String>, AuthError> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Basic {}", self.encoded_credentials()),
        );
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Ok(headers)
    }

    async fn self_test(&self) -> SelfTest {
        let url = format!("{}/auth", self.base_url);
        let result = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Basic {}", self.encoded_credentials()))
            .json(&json!({}))
            .send()
            .await;
        outcome_from_probe(result)
    }
}

//! Microsoft Graph-style user listing connector.
//!
//! OAuth2 client-credentials authentication against the tenant's token
//! endpoint, delegated to the core provider with a remapped context. The
//! skill fetches users by id, by email filter, or unfiltered.

use serde_json::{json, Value};
use tether::auth::{apply_headers, AuthContext, AuthProvider, FromAuthContext, OAuth2ClientCredentials};
use tether::params::{DataType, ParamSet, ParamSpec, RawInputs};
use tether::skill::{respond, SkillError};

const USER_DETAILS_KEY: &str = "USER_DETAILS";

const DEFAULT_LOGIN_URL: &str = "https://login.microsoftonline.com";
const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Builds the users URL: a path segment for an id lookup, a `$filter`
/// clause for an email lookup, bare otherwise.
fn build_users_url(base_url: &str, user_id: Option<&str>, email: Option<&str>) -> String {
    let users = format!("{}/v1.0/users", base_url);
    match (user_id, email) {
        (Some(id), _) => format!("{}/{}", users, id),
        (None, Some(email)) => format!(
            "{}?$filter=mail eq '{}' or userPrincipalName eq '{}'",
            users, email, email
        ),
        (None, None) => users,
    }
}

/// Remaps the Graph connection parameters onto the generic OAuth2
/// client-credentials contract.
fn oauth_context(ctx: &AuthContext, login_url: &str) -> Result<AuthContext, SkillError> {
    let mut set = ParamSet::new();
    let client_id = set.required("CLIENT_ID", DataType::String, "Graph API client ID");
    let client_secret = set.required("CLIENT_SECRET", DataType::String, "Graph API client secret");
    let tenant_id = set.required("TENANT_ID", DataType::String, "Azure tenant ID");

    let client_id = client_id.read_string(ctx)?;
    let client_secret = client_secret.read_string(ctx)?;
    let tenant_id = tenant_id.read_string(ctx)?;

    let mut oauth_ctx = AuthContext::new();
    oauth_ctx.insert(
        "OAUTH_TOKEN_URL".to_string(),
        json!(format!("{}/{}/oauth2/v2.0/token", login_url, tenant_id)),
    );
    oauth_ctx.insert("CLIENT_ID".to_string(), json!(client_id));
    oauth_ctx.insert("CLIENT_SECRET".to_string(), json!(client_secret));
    oauth_ctx.insert("SCOPE".to_string(), json!(GRAPH_SCOPE));
    Ok(oauth_ctx)
}

struct InputContract {
    user_id: ParamSpec,
    email: ParamSpec,
}

fn input_contract() -> InputContract {
    let mut set = ParamSet::new();
    InputContract {
        user_id: set.optional("USER_ID", DataType::String, "ID of the user to fetch"),
        email: set.optional("EMAIL", DataType::String, "Email address to filter users by"),
    }
}

/// One configured Microsoft Graph connector instance.
#[derive(Debug)]
pub struct MsGraphConnector {
    auth: OAuth2ClientCredentials,
    base_url: String,
    http_client: reqwest::Client,
}

impl MsGraphConnector {
    pub fn from_context(ctx: &AuthContext) -> Result<Self, SkillError> {
        Self::from_context_with_endpoints(ctx, DEFAULT_LOGIN_URL, DEFAULT_GRAPH_URL)
    }

    /// Custom identity and API endpoints (used by tests).
    pub fn from_context_with_endpoints(
        ctx: &AuthContext,
        login_url: &str,
        graph_url: &str,
    ) -> Result<Self, SkillError> {
        let oauth_ctx = oauth_context(ctx, login_url)?;
        Ok(Self {
            auth: OAuth2ClientCredentials::from_context(&oauth_ctx)?,
            base_url: graph_url.to_string(),
            http_client: reqwest::Client::new(),
        })
    }

    /// Fetches user details from the Graph users endpoint.
    pub async fn list_user_details(&self, inputs: &RawInputs) -> Value {
        respond(USER_DETAILS_KEY, self.run(inputs).await)
    }

    async fn run(&self, inputs: &RawInputs) -> Result<Value, SkillError> {
        let contract = input_contract();
        let user_id = contract.user_id.read_value(inputs)?;
        let email = contract.email.read_value(inputs)?;

        // First headers() call performs the lazy token exchange.
        let headers = self.auth.headers().await?;

        let url = build_users_url(&self.base_url, user_id.as_str(), email.as_str());
        let response = apply_headers(self.http_client.get(&url), &headers)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SkillError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let user_details: Value = response.json().await?;
        tracing::info!(url = %url, "User details fetched successfully");
        Ok(user_details)
    }
}

/// Skill entry point invoked by the hosting platform.
pub async fn run_skill(input_params: &RawInputs, auth_params: &AuthContext) -> Value {
    match MsGraphConnector::from_context(auth_params) {
        Ok(connector) => connector.list_user_details(input_params).await,
        Err(e) => respond(USER_DETAILS_KEY, Err(e)),
    }
}

/// Verifies the configured credentials for the operator UI.
///
/// The probe is a token exchange against the tenant's identity endpoint.
pub async fn test_authentication(auth_params: &AuthContext) -> u16 {
    match MsGraphConnector::from_context(auth_params) {
        Ok(connector) => connector.auth.self_test().await.status_code(),
        Err(_) => 400,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn auth_ctx() -> AuthContext {
        let mut ctx = AuthContext::new();
        ctx.insert("CLIENT_ID".to_string(), json!("cid"));
        ctx.insert("CLIENT_SECRET".to_string(), json!("cs"));
        ctx.insert("TENANT_ID".to_string(), json!("tenant-1"));
        ctx
    }

    fn inputs(pairs: &[(&str, Value)]) -> RawInputs {
        let mut map = RawInputs::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.clone());
        }
        map
    }

    #[test]
    fn test_users_url_by_id() {
        let url = build_users_url("https://graph.microsoft.com", Some("u-1"), None);
        assert_eq!(url, "https://graph.microsoft.com/v1.0/users/u-1");
    }

    #[test]
    fn test_users_url_by_email_filter() {
        let url = build_users_url("https://graph.microsoft.com", None, Some("jo@example.com"));
        assert_eq!(
            url,
            "https://graph.microsoft.com/v1.0/users?$filter=mail eq 'jo@example.com' or userPrincipalName eq 'jo@example.com'"
        );
    }

    #[test]
    fn test_users_url_id_takes_precedence() {
        let url = build_users_url("https://g", Some("u-1"), Some("jo@example.com"));
        assert_eq!(url, "https://g/v1.0/users/u-1");
    }

    #[test]
    fn test_missing_tenant_is_config_error() {
        let mut ctx = auth_ctx();
        ctx.remove("TENANT_ID");
        let err = MsGraphConnector::from_context(&ctx).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn test_list_user_details_acquires_token_then_queries() {
        let mut server = mockito::Server::new_async().await;

        let token = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"graph-tok","expires_in":3599}"#)
            .expect(1)
            .create_async()
            .await;

        let users = server
            .mock("GET", "/v1.0/users/u-1")
            .match_header("authorization", "Bearer graph-tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"u-1","displayName":"Jo Smith"}"#)
            .create_async()
            .await;

        let connector =
            MsGraphConnector::from_context_with_endpoints(&auth_ctx(), &server.url(), &server.url())
                .unwrap();

        let response = connector
            .list_user_details(&inputs(&[("USER_ID", json!("u-1"))]))
            .await;

        assert_eq!(response["STATUS"], 200);
        assert_eq!(response["USER_DETAILS"]["displayName"], "Jo Smith");
        token.assert_async().await;
        users.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_token_exchange_maps_to_401() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;

        let connector =
            MsGraphConnector::from_context_with_endpoints(&auth_ctx(), &server.url(), &server.url())
                .unwrap();

        let response = connector.list_user_details(&inputs(&[])).await;
        assert_eq!(response["STATUS"], 401);
    }
}

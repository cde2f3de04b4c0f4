//! Integration tests for the self-test contract consumed by the operator UI:
//! `test_authentication` returns exactly one of 200, 400, 401.

use serde_json::json;
use tether::auth::{ApiKeyAuth, AuthContext, Base64BasicAuth, OAuth2ClientCredentials};
use tether::skill::test_authentication;

fn ctx(pairs: &[(&str, String)]) -> AuthContext {
    let mut map = AuthContext::new();
    for (k, v) in pairs {
        map.insert(k.to_string(), json!(v));
    }
    map
}

#[tokio::test]
async fn test_api_key_probe_success_yields_200() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/auth")
        .with_status(201)
        .create_async()
        .await;

    let code = test_authentication::<ApiKeyAuth>(&ctx(&[
        ("API_URL", server.url()),
        ("API_KEY", "key".to_string()),
    ]))
    .await;

    assert_eq!(code, 200);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_api_key_probe_rejection_yields_401() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/auth")
        .with_status(403)
        .create_async()
        .await;

    let code = test_authentication::<ApiKeyAuth>(&ctx(&[
        ("API_URL", server.url()),
        ("API_KEY", "bad".to_string()),
    ]))
    .await;

    assert_eq!(code, 401);
}

#[tokio::test]
async fn test_missing_parameter_yields_400_without_network_call() {
    let mut server = mockito::Server::new_async().await;
    // Any request hitting the server would match and fail the expect(0).
    let mock = server
        .mock("POST", mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let code = test_authentication::<ApiKeyAuth>(&ctx(&[("API_URL", server.url())])).await;

    assert_eq!(code, 400);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_base64_basic_probe_sends_encoded_header() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/auth")
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .with_status(200)
        .create_async()
        .await;

    let code = test_authentication::<Base64BasicAuth>(&ctx(&[
        ("USERNAME", "user".to_string()),
        ("PASSWORD", "pass".to_string()),
        ("BASE_URL", server.url()),
    ]))
    .await;

    assert_eq!(code, 200);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_oauth2_probe_is_a_token_exchange() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"tok","expires_in":3599}"#)
        .create_async()
        .await;

    let code = test_authentication::<OAuth2ClientCredentials>(&ctx(&[
        ("OAUTH_TOKEN_URL", format!("{}/token", server.url())),
        ("CLIENT_ID", "cid".to_string()),
        ("CLIENT_SECRET", "cs".to_string()),
        ("SCOPE", "https://graph.microsoft.com/.default".to_string()),
    ]))
    .await;

    assert_eq!(code, 200);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_oauth2_rejected_credentials_yield_401() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"error":"invalid_client"}"#)
        .create_async()
        .await;

    let code = test_authentication::<OAuth2ClientCredentials>(&ctx(&[
        ("OAUTH_TOKEN_URL", format!("{}/token", server.url())),
        ("CLIENT_ID", "cid".to_string()),
        ("CLIENT_SECRET", "wrong".to_string()),
        ("SCOPE", "scope".to_string()),
    ]))
    .await;

    assert_eq!(code, 401);
}

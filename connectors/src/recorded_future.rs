//! Recorded Future-style alert listing connector.
//!
//! API-key authentication with a vendor header (`X-RFToken`), so the
//! connector implements the auth capability itself instead of reusing the
//! generic bearer provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tether::auth::{
    apply_headers, outcome_from_probe, AuthContext, AuthError, AuthProvider, FromAuthContext,
    SelfTest,
};
use tether::params::{DataType, ParamError, ParamSet, ParamSpec, ParamValue, RawInputs};
use tether::skill::{respond, SkillError};

const ALERTS_KEY: &str = "ALERTS";

/// Alert timestamps use millisecond precision with a literal zero fraction.
fn format_triggered(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S.000Z").to_string()
}

/// Vendor auth: static API key sent in the `X-RFToken` header.
pub struct RecordedFutureAuth {
    api_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl RecordedFutureAuth {
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl FromAuthContext for RecordedFutureAuth {
    fn from_context(ctx: &AuthContext) -> Result<Self, ParamError> {
        let mut set = ParamSet::new();
        let api_url = set.required("API_URL", DataType::String, "Base API URL");
        let api_key = set.required("API_KEY", DataType::String, "API key");
        Ok(Self {
            api_url: api_url.read_string(ctx)?,
            api_key: api_key.read_string(ctx)?,
            http_client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl AuthProvider for RecordedFutureAuth {
    async fn headers(&self) -> Result<HashMap<String, String>, AuthError> {
        let mut headers = HashMap::new();
        headers.insert("X-RFToken".to_string(), self.api_key.clone());
        headers.insert("accept".to_string(), "application/json".to_string());
        Ok(headers)
    }

    async fn self_test(&self) -> SelfTest {
        let url = format!("{}/alert/v3", self.api_url);
        let result = self
            .http_client
            .get(&url)
            .header("X-RFToken", &self.api_key)
            .query(&[("limit", "1")])
            .send()
            .await;
        outcome_from_probe(result)
    }
}

struct InputContract {
    from_index: ParamSpec,
    limit: ParamSpec,
    start_time: ParamSpec,
    end_time: ParamSpec,
    assignee: ParamSpec,
    status_in_portal: ParamSpec,
    order_by: ParamSpec,
    direction: ParamSpec,
}

fn input_contract() -> InputContract {
    let mut set = ParamSet::new();
    InputContract {
        from_index: set.optional("FROM_INDEX", DataType::Int, "Starting index for pagination"),
        limit: set.optional("LIMIT", DataType::Int, "Maximum number of alerts"),
        start_time: set.optional("START_TIME", DataType::Int, "Start timestamp in epoch format"),
        end_time: set.optional("END_TIME", DataType::Int, "End timestamp in epoch format"),
        assignee: set.optional("ASSIGNEE", DataType::String, "Filter alerts by assignee"),
        status_in_portal: set.optional(
            "STATUS_IN_PORTAL",
            DataType::String,
            "Filter alerts by portal status",
        ),
        order_by: set.optional("ORDER_BY", DataType::String, "Field to order results by"),
        direction: set.optional("DIRECTION", DataType::String, "Sort direction (asc or desc)"),
    }
}

/// Builds the alert query string pairs from the typed inputs.
///
/// The `triggered` window is only present when a start time was given; its
/// end defaults to now. Absent optional parameters are omitted entirely.
fn build_query(inputs: &RawInputs) -> Result<Vec<(String, String)>, SkillError> {
    let contract = input_contract();
    let mut query = Vec::new();

    let start_time = contract.start_time.read_value(inputs)?.as_int();
    let end_time = contract.end_time.read_value(inputs)?.as_int();

    if let Some(start) = start_time {
        let range = tether::job::TimeRange::from_epochs(start, end_time);
        query.push((
            "triggered".to_string(),
            format!(
                "[{}, {}]",
                format_triggered(&range.earliest),
                format_triggered(&range.latest)
            ),
        ));
    }

    let string_params = [
        ("assignee", &contract.assignee),
        ("statusInPortal", &contract.status_in_portal),
        ("orderBy", &contract.order_by),
        ("direction", &contract.direction),
    ];
    for (key, spec) in string_params {
        if let ParamValue::Str(value) = spec.read_value(inputs)? {
            query.push((key.to_string(), value));
        }
    }

    let int_params = [("limit", &contract.limit), ("from", &contract.from_index)];
    for (key, spec) in int_params {
        if let Some(value) = spec.read_value(inputs)?.as_int() {
            query.push((key.to_string(), value.to_string()));
        }
    }

    Ok(query)
}

/// One configured Recorded Future connector instance.
pub struct RecordedFutureConnector {
    auth: RecordedFutureAuth,
    http_client: reqwest::Client,
}

impl RecordedFutureConnector {
    pub fn from_context(ctx: &AuthContext) -> Result<Self, SkillError> {
        Ok(Self {
            auth: RecordedFutureAuth::from_context(ctx)?,
            http_client: reqwest::Client::new(),
        })
    }

    /// Lists alerts matching the supplied filters.
    pub async fn list_alerts(&self, inputs: &RawInputs) -> Value {
        respond(ALERTS_KEY, self.run(inputs).await)
    }

    async fn run(&self, inputs: &RawInputs) -> Result<Value, SkillError> {
        let query = build_query(inputs)?;
        let headers = self.auth.headers().await?;

        let url = format!("{}/alert/v3", self.auth.api_url());
        let request = apply_headers(self.http_client.get(&url), &headers).query(&query);

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SkillError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let alerts: Value = response.json().await?;
        tracing::info!(url = %url, "Alerts fetched successfully");
        Ok(alerts)
    }
}

/// Skill entry point invoked by the hosting platform.
pub async fn run_skill(input_params: &RawInputs, auth_params: &AuthContext) -> Value {
    match RecordedFutureConnector::from_context(auth_params) {
        Ok(connector) => connector.list_alerts(input_params).await,
        Err(e) => respond(ALERTS_KEY, Err(e)),
    }
}

/// Verifies the configured credentials for the operator UI.
pub async fn test_authentication(auth_params: &AuthContext) -> u16 {
    tether::skill::test_authentication::<RecordedFutureAuth>(auth_params).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn auth_ctx(api_url: &str) -> AuthContext {
        let mut ctx = AuthContext::new();
        ctx.insert("API_URL".to_string(), json!(api_url));
        ctx.insert("API_KEY".to_string(), json!("rf-key"));
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
    fn test_build_query_triggered_window() {
        let query = build_query(&inputs(&[
            ("START_TIME", json!(1_700_000_000)),
            ("END_TIME", json!(1_700_000_300)),
        ]))
        .unwrap();

        assert_eq!(
            query,
            vec![(
                "triggered".to_string(),
                "[2023-11-14T22:13:20.000Z, 2023-11-14T22:18:20.000Z]".to_string()
            )]
        );
    }

    #[test]
    fn test_build_query_omits_absent_params() {
        let query = build_query(&inputs(&[
            ("LIMIT", json!("25")),
            ("ASSIGNEE", json!("analyst@example.com")),
        ]))
        .unwrap();

        assert_eq!(query.len(), 2);
        assert!(query.contains(&("limit".to_string(), "25".to_string())));
        assert!(query.contains(&("assignee".to_string(), "analyst@example.com".to_string())));
    }

    #[test]
    fn test_build_query_rejects_non_numeric_limit() {
        let err = build_query(&inputs(&[("LIMIT", json!("lots"))])).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn test_list_alerts_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/alert/v3")
            .match_query(Matcher::UrlEncoded("limit".to_string(), "5".to_string()))
            .match_header("x-rftoken", "rf-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"id":"a1","title":"Leaked credential"}]}"#)
            .create_async()
            .await;

        let response = run_skill(&inputs(&[("LIMIT", json!(5))]), &auth_ctx(&server.url())).await;

        assert_eq!(response["STATUS"], 200);
        assert_eq!(response["ALERTS"]["data"][0]["id"], "a1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upstream_401_surfaces_as_401() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/alert/v3")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("bad token")
            .create_async()
            .await;

        let response = run_skill(&inputs(&[]), &auth_ctx(&server.url())).await;
        assert_eq!(response["STATUS"], 401);
    }

    #[tokio::test]
    async fn test_missing_api_key_maps_to_400() {
        let mut ctx = AuthContext::new();
        ctx.insert("API_URL".to_string(), json!("https://api.example.com"));

        let response = run_skill(&inputs(&[]), &ctx).await;
        assert_eq!(response["STATUS"], 400);
        assert!(response["ALERTS"].as_str().unwrap().contains("API_KEY"));
    }
}

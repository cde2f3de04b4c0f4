//! BambooHR-style user lookup connector.
//!
//! Base64 basic authentication with the API key as the username and a
//! literal `x` password, delegated to the core provider with a remapped
//! context. The skill resolves one employee filter from several optional
//! criteria and queries the employee dataset endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use tether::auth::{
    apply_headers, outcome_from_probe, AuthContext, AuthError, AuthProvider, Base64BasicAuth,
    FromAuthContext, SelfTest,
};
use tether::params::{DataType, ParamError, ParamSet, ParamSpec, RawInputs};
use tether::skill::{respond, SkillError};

const EMPLOYEES_KEY: &str = "EMPLOYEES";

/// Fields requested for every employee lookup.
const EMPLOYEE_FIELDS: [&str; 5] = ["firstName", "lastName", "email", "jobTitle", "department"];

/// Vendor auth: the API key is the basic-auth username, the password is a
/// literal `x`.
pub struct BambooAuth {
    inner: Base64BasicAuth,
    company_domain: String,
    http_client: reqwest::Client,
}

impl BambooAuth {
    pub fn base_url(&self) -> &str {
        self.inner.base_url()
    }

    /// The company subdomain, the first label of the company domain.
    pub fn subdomain(&self) -> &str {
        self.company_domain
            .split('.')
            .next()
            .unwrap_or(&self.company_domain)
    }
}

impl FromAuthContext for BambooAuth {
    fn from_context(ctx: &AuthContext) -> Result<Self, ParamError> {
        let mut set = ParamSet::new();
        let api_key = set.required("API_KEY", DataType::String, "BambooHR API key");
        let company_domain = set.required(
            "COMPANY_DOMAIN",
            DataType::String,
            "Company domain (e.g. company.bamboohr.com)",
        );

        let api_key = api_key.read_string(ctx)?;
        let company_domain = company_domain.read_string(ctx)?;

        // Remap onto the generic Base64 provider's contract.
        let mut basic_ctx = AuthContext::new();
        basic_ctx.insert("USERNAME".to_string(), json!(api_key));
        basic_ctx.insert("PASSWORD".to_string(), json!("x"));
        basic_ctx.insert(
            "BASE_URL".to_string(),
            json!(format!("https://{}/api/v1", company_domain)),
        );

        Ok(Self {
            inner: Base64BasicAuth::from_context(&basic_ctx)?,
            company_domain,
            http_client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl AuthProvider for BambooAuth {
    async fn headers(&self) -> Result<HashMap<String, String>, AuthError> {
        self.inner.headers().await
    }

    async fn self_test(&self) -> SelfTest {
        // Minimal authenticated read against a single employee record.
        let url = format!("{}/employees/0", self.inner.base_url());
        let headers = match self.headers().await {
            Ok(h) => h,
            Err(_) => return SelfTest::AuthFailure,
        };
        let result = apply_headers(self.http_client.get(&url), &headers)
            .query(&[("fields", "firstName,lastName"), ("onlyCurrent", "1")])
            .send()
            .await;
        outcome_from_probe(result)
    }
}

struct InputContract {
    email: ParamSpec,
    name: ParamSpec,
    employee_id: ParamSpec,
    filter_key: ParamSpec,
    filter_value: ParamSpec,
}

fn input_contract() -> InputContract {
    let mut set = ParamSet::new();
    InputContract {
        email: set.optional("EMAIL", DataType::String, "User's email address"),
        name: set.optional("NAME", DataType::String, "User's name (firstNameLastName)"),
        employee_id: set.optional("EMPLOYEE_ID", DataType::String, "Employee ID"),
        filter_key: set.optional("FILTER_KEY", DataType::String, "Custom filter field"),
        filter_value: set.optional("FILTER_VALUE", DataType::String, "Custom filter value"),
    }
}

/// Resolves the single dataset filter from the optional criteria.
///
/// Precedence: email, then name, then employee id, then the custom
/// key/value pair (which requires both halves). At least one criterion must
/// be present.
fn resolve_filter(inputs: &RawInputs) -> Result<(String, String), SkillError> {
    let contract = input_contract();

    let email = contract.email.read_value(inputs)?;
    let name = contract.name.read_value(inputs)?;
    let employee_id = contract.employee_id.read_value(inputs)?;
    let filter_key = contract.filter_key.read_value(inputs)?;
    let filter_value = contract.filter_value.read_value(inputs)?;

    if let Some(email) = email.as_str() {
        return Ok(("email".to_string(), email.to_string()));
    }
    if let Some(name) = name.as_str() {
        return Ok(("firstNameLastName".to_string(), name.to_string()));
    }
    if let Some(id) = employee_id.as_str() {
        return Ok(("eeid".to_string(), id.to_string()));
    }
    match (filter_key.as_str(), filter_value.as_str()) {
        (Some(key), Some(value)) => Ok((key.to_string(), value.to_string())),
        (Some(_), None) | (None, Some(_)) => Err(SkillError::Invalid(
            "Both FILTER_KEY and FILTER_VALUE must be provided when using custom filters"
                .to_string(),
        )),
        (None, None) => Err(SkillError::Invalid(
            "At least one search criteria (EMAIL, NAME, EMPLOYEE_ID, or FILTER_KEY) must be provided"
                .to_string(),
        )),
    }
}

/// One configured BambooHR connector instance.
pub struct BambooHrConnector {
    auth: BambooAuth,
    gateway_url: String,
    http_client: reqwest::Client,
}

impl BambooHrConnector {
    pub fn from_context(ctx: &AuthContext) -> Result<Self, SkillError> {
        let auth = BambooAuth::from_context(ctx)?;
        let gateway_url = format!(
            "https://api.bamboohr.com/api/gateway.php/{}/v1",
            auth.subdomain()
        );
        Ok(Self {
            auth,
            gateway_url,
            http_client: reqwest::Client::new(),
        })
    }

    /// Overrides the dataset gateway URL (used by tests).
    pub fn with_gateway_url(mut self, gateway_url: String) -> Self {
        self.gateway_url = gateway_url;
        self
    }

    /// Looks up employees matching one filter criterion.
    pub async fn get_user_details(&self, inputs: &RawInputs) -> Value {
        respond(EMPLOYEES_KEY, self.run(inputs).await)
    }

    async fn run(&self, inputs: &RawInputs) -> Result<Value, SkillError> {
        let (filter_key, filter_value) = resolve_filter(inputs)?;
        let headers = self.auth.headers().await?;

        let payload = json!({
            "fields": EMPLOYEE_FIELDS,
            "filters": {
                "match": "all",
                "filters": [
                    { "field": filter_key, "operator": "equal", "value": filter_value }
                ]
            }
        });

        let url = format!("{}/datasets/employee", self.gateway_url);
        let response = apply_headers(self.http_client.post(&url), &headers)
            .json(&payload)
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

        let employees: Value = response.json().await?;
        if employees
            .get("data")
            .map(|d| d.as_array().map_or(true, |a| a.is_empty()))
            .unwrap_or(true)
        {
            tracing::info!(filter = %filter_key, "No user found for filter");
        }
        Ok(employees)
    }
}

/// Skill entry point invoked by the hosting platform.
pub async fn run_skill(input_params: &RawInputs, auth_params: &AuthContext) -> Value {
    match BambooHrConnector::from_context(auth_params) {
        Ok(connector) => connector.get_user_details(input_params).await,
        Err(e) => respond(EMPLOYEES_KEY, Err(e)),
    }
}

/// Verifies the configured credentials for the operator UI.
pub async fn test_authentication(auth_params: &AuthContext) -> u16 {
    tether::skill::test_authentication::<BambooAuth>(auth_params).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn auth_ctx() -> AuthContext {
        let mut ctx = AuthContext::new();
        ctx.insert("API_KEY".to_string(), json!("bamboo-key"));
        ctx.insert("COMPANY_DOMAIN".to_string(), json!("acme.bamboohr.com"));
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
    fn test_filter_precedence_email_first() {
        let (key, value) = resolve_filter(&inputs(&[
            ("EMAIL", json!("jo@example.com")),
            ("NAME", json!("JoSmith")),
            ("EMPLOYEE_ID", json!("17")),
        ]))
        .unwrap();
        assert_eq!((key.as_str(), value.as_str()), ("email", "jo@example.com"));
    }

    #[test]
    fn test_filter_name_maps_to_vendor_field() {
        let (key, _) = resolve_filter(&inputs(&[("NAME", json!("JoSmith"))])).unwrap();
        assert_eq!(key, "firstNameLastName");
    }

    #[test]
    fn test_filter_employee_id_maps_to_eeid() {
        let (key, value) = resolve_filter(&inputs(&[("EMPLOYEE_ID", json!("17"))])).unwrap();
        assert_eq!((key.as_str(), value.as_str()), ("eeid", "17"));
    }

    #[test]
    fn test_custom_filter_requires_both_halves() {
        let err = resolve_filter(&inputs(&[("FILTER_KEY", json!("department"))])).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_no_criteria_is_invalid() {
        let err = resolve_filter(&inputs(&[])).unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(err.to_string().contains("At least one search criteria"));
    }

    #[test]
    fn test_subdomain_extraction() {
        let auth = BambooAuth::from_context(&auth_ctx()).unwrap();
        assert_eq!(auth.subdomain(), "acme");
        assert_eq!(auth.base_url(), "https://acme.bamboohr.com/api/v1");
    }

    #[tokio::test]
    async fn test_get_user_details_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/datasets/employee")
            // API key as username, "x" as password: base64("bamboo-key:x")
            .match_header("authorization", "Basic YmFtYm9vLWtleTp4")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"firstName":"Jo","lastName":"Smith"}]}"#)
            .create_async()
            .await;

        let connector = BambooHrConnector::from_context(&auth_ctx())
            .unwrap()
            .with_gateway_url(server.url());

        let response = connector
            .get_user_details(&inputs(&[("EMAIL", json!("jo@example.com"))]))
            .await;

        assert_eq!(response["STATUS"], 200);
        assert_eq!(response["EMPLOYEES"]["data"][0]["firstName"], "Jo");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_input_short_circuits_before_network() {
        // No criteria at all: the request must fail locally with 400.
        let connector = BambooHrConnector::from_context(&auth_ctx())
            .unwrap()
            .with_gateway_url("http://127.0.0.1:1".to_string());

        let response = connector.get_user_details(&inputs(&[])).await;
        assert_eq!(response["STATUS"], 400);
    }
}

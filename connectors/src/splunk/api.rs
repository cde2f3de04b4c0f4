//! HTTP backend for the Splunk search job API.
//!
//! Three endpoints under `/servicesNS/{user}/search/search/jobs`: POST to
//! submit a search, GET on the job for its dispatch state, GET on
//! `/results` for the finished output. All responses are JSON
//! (`output_mode=json`).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tether::auth::DelegatedBasicAuth;
use tether::job::{BackendError, JobBackend, TimeRange};
use uuid::Uuid;

/// Submission response: the server-assigned search id.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusContent {
    #[serde(rename = "dispatchState")]
    dispatch_state: String,
}

#[derive(Debug, Deserialize)]
struct StatusEntry {
    content: StatusContent,
}

/// Job status response; the dispatch state lives on the first entry.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    entry: Vec<StatusEntry>,
}

/// Search job backend bound to one Splunk instance and one credential pair.
pub struct SplunkBackend {
    http_client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    max_count: Option<i64>,
}

impl SplunkBackend {
    pub fn new(auth: &DelegatedBasicAuth, max_count: Option<i64>) -> Self {
        let (username, password) = auth.credentials();
        Self {
            http_client: reqwest::Client::new(),
            base_url: auth.base_url().to_string(),
            username: username.to_string(),
            password: password.to_string(),
            max_count,
        }
    }

    fn jobs_url(&self) -> String {
        format!(
            "{}/servicesNS/{}/search/search/jobs",
            self.base_url, self.username
        )
    }
}

/// Fails on a non-success status, capturing the body for the log.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read body>".to_string());
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl JobBackend for SplunkBackend {
    async fn submit(&self, query: &str, range: &TimeRange) -> Result<String, BackendError> {
        let (earliest, latest) = range.format_bounds();
        let sid = format!("sid-{}", Uuid::new_v4());

        let mut form: Vec<(&str, String)> = vec![
            ("search", query.to_string()),
            ("id", sid),
            ("earliest_time", earliest),
            ("latest_time", latest),
            ("output_mode", "json".to_string()),
        ];
        if let Some(max_count) = self.max_count {
            form.push(("max_count", max_count.to_string()));
        }

        let response = self
            .http_client
            .post(self.jobs_url())
            .basic_auth(&self.username, Some(&self.password))
            .form(&form)
            .send()
            .await?;

        let submit: SubmitResponse = check_status(response).await?.json().await?;
        submit
            .sid
            .ok_or_else(|| BackendError::Transport("submit response carried no sid".to_string()))
    }

    async fn status(&self, job_id: &str) -> Result<String, BackendError> {
        let url = format!("{}/{}", self.jobs_url(), job_id);
        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("output_mode", "json")])
            .send()
            .await?;

        let status: StatusResponse = check_status(response).await?.json().await?;
        status
            .entry
            .into_iter()
            .next()
            .map(|entry| entry.content.dispatch_state)
            .ok_or_else(|| BackendError::Transport("status response carried no entry".to_string()))
    }

    async fn fetch(&self, job_id: &str) -> Result<Value, BackendError> {
        let url = format!("{}/{}/results", self.jobs_url(), job_id);
        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("output_mode", "json")])
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}

//! Invocation boundary: typed errors in, HTTP-style statuses out.
//!
//! Every skill entry point returns a uniform `{"STATUS": n, <payload_key>:
//! ...}` object. Success carries the upstream payload; failure carries a
//! human-readable message and one of three statuses: 400 for missing or
//! invalid parameters, 401 for upstream authentication rejection, 500 for
//! everything else. The finer-grained failure kind never reaches the caller;
//! it is emitted as a structured log field for diagnosis.

use crate::auth::{AuthContext, AuthError, AuthProvider, FromAuthContext};
use crate::job::JobError;
use crate::params::ParamError;
use serde_json::{json, Value};
use std::fmt;

/// Everything a skill invocation can fail with, one variant per taxonomy
/// entry. The single place numeric statuses are decided is
/// [`SkillError::status`].
#[derive(Debug)]
pub enum SkillError {
    /// Missing or untypeable parameter.
    Param(ParamError),
    /// Credential acquisition failed.
    Auth(AuthError),
    /// The upstream rejected a request with an HTTP error status.
    Upstream { status: u16, body: String },
    /// Remote job lifecycle failure (submission, explicit failure, timeout,
    /// poll, result fetch).
    Job(JobError),
    /// Cross-field input validation failed.
    Invalid(String),
    /// Anything else caught at the boundary (network, parse).
    Internal(anyhow::Error),
}

impl SkillError {
    /// Maps the error to the invocation contract's STATUS code.
    pub fn status(&self) -> u16 {
        match self {
            SkillError::Param(_) | SkillError::Invalid(_) => 400,
            SkillError::Auth(_) => 401,
            // Upstream auth rejection surfaces as 401; any other upstream
            // failure is a 500 like the rest.
            SkillError::Upstream { status: 401, .. } => 401,
            SkillError::Upstream { .. } => 500,
            SkillError::Job(_) => 500,
            SkillError::Internal(_) => 500,
        }
    }

    /// Stable kind label for the diagnostic log.
    pub fn kind(&self) -> &'static str {
        match self {
            SkillError::Param(_) => "param",
            SkillError::Auth(_) => "auth",
            SkillError::Upstream { .. } => "upstream",
            SkillError::Job(e) => e.kind(),
            SkillError::Invalid(_) => "invalid_input",
            SkillError::Internal(_) => "internal",
        }
    }
}

impl fmt::Display for SkillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillError::Param(e) => write!(f, "{}", e),
            SkillError::Auth(e) => write!(f, "{}", e),
            SkillError::Upstream { status, body } => {
                write!(f, "Upstream request failed with status {}: {}", status, body)
            }
            SkillError::Job(e) => write!(f, "{}", e),
            SkillError::Invalid(msg) => write!(f, "{}", msg),
            SkillError::Internal(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SkillError {}

impl From<ParamError> for SkillError {
    fn from(e: ParamError) -> Self {
        SkillError::Param(e)
    }
}

impl From<AuthError> for SkillError {
    fn from(e: AuthError) -> Self {
        SkillError::Auth(e)
    }
}

impl From<JobError> for SkillError {
    fn from(e: JobError) -> Self {
        SkillError::Job(e)
    }
}

impl From<anyhow::Error> for SkillError {
    fn from(e: anyhow::Error) -> Self {
        SkillError::Internal(e)
    }
}

impl From<reqwest::Error> for SkillError {
    fn from(e: reqwest::Error) -> Self {
        SkillError::Internal(e.into())
    }
}

/// Packages a skill outcome into the uniform response object.
///
/// On success the payload lands under `payload_key` with STATUS 200. On
/// failure the payload field carries the error message as a string.
pub fn respond(payload_key: &str, result: Result<Value, SkillError>) -> Value {
    match result {
        Ok(payload) => json!({ "STATUS": 200, payload_key: payload }),
        Err(e) => {
            tracing::error!(kind = %e.kind(), status = e.status(), error = %e, "Skill failed");
            json!({ "STATUS": e.status(), payload_key: e.to_string() })
        }
    }
}

/// Self-test boundary: builds the provider from the context and probes it.
///
/// Returns exactly one of 200, 400, 401. A missing required connection
/// parameter yields 400 without any network call being attempted.
pub async fn test_authentication<P>(ctx: &AuthContext) -> u16
where
    P: AuthProvider + FromAuthContext,
{
    match P::from_context(ctx) {
        Ok(provider) => provider.self_test().await.status_code(),
        Err(e) => {
            tracing::warn!(error = %e, "Self-test rejected: bad configuration");
            crate::auth::SelfTest::BadConfig.status_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{BackendError, JobError};
    use std::time::Duration;

    #[test]
    fn test_param_errors_map_to_400() {
        let err = SkillError::Param(ParamError::Missing {
            name: "QUERY".to_string(),
        });
        assert_eq!(err.status(), 400);
        assert_eq!(
            SkillError::Invalid("at least one criterion required".to_string()).status(),
            400
        );
    }

    #[test]
    fn test_auth_errors_map_to_401() {
        assert_eq!(
            SkillError::Auth(AuthError::TokenEndpoint { status: 403 }).status(),
            401
        );
        assert_eq!(
            SkillError::Upstream {
                status: 401,
                body: "unauthorized".to_string()
            }
            .status(),
            401
        );
    }

    #[test]
    fn test_job_errors_all_collapse_to_500() {
        let errors = [
            JobError::Submission(BackendError::Transport("x".to_string())),
            JobError::Failed {
                id: "j".to_string(),
            },
            JobError::Timeout {
                id: "j".to_string(),
                elapsed: Duration::from_secs(3600),
            },
            JobError::ResultFetch {
                id: "j".to_string(),
                source: BackendError::Transport("x".to_string()),
            },
        ];
        for err in errors {
            // The kind stays distinct for logging even though the status is
            // always 500.
            let skill_err = SkillError::Job(err);
            assert_eq!(skill_err.status(), 500);
        }
    }

    #[test]
    fn test_non_auth_upstream_failure_is_500() {
        let err = SkillError::Upstream {
            status: 503,
            body: "down".to_string(),
        };
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn test_respond_success_shape() {
        let response = respond("RESULTS", Ok(json!({"count": 2})));
        assert_eq!(response["STATUS"], 200);
        assert_eq!(response["RESULTS"]["count"], 2);
    }

    #[test]
    fn test_respond_failure_carries_message_string() {
        let err = SkillError::Param(ParamError::Missing {
            name: "INSTANCE".to_string(),
        });
        let response = respond("RESULTS", Err(err));
        assert_eq!(response["STATUS"], 400);
        let message = response["RESULTS"].as_str().unwrap();
        assert!(message.contains("INSTANCE"));
    }
}

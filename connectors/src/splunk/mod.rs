//! Splunk-style search connector.
//!
//! The only template with a long-running remote operation: `execute_query`
//! submits a search job, polls its dispatch state every 2 seconds under a
//! one-hour ceiling, and fetches the results once the job reports `DONE`.

pub mod api;

use self::api::SplunkBackend;
use serde_json::Value;
use tether::auth::{AuthContext, DelegatedBasicAuth, FromAuthContext};
use tether::job::{JobConfig, JobExecutor, TimeRange};
use tether::params::{DataType, ParamSet, ParamSpec, ParamValue, RawInputs};
use tether::skill::{respond, SkillError};

const RESULTS_KEY: &str = "RESULTS";

/// Default search window when no start time is supplied: the last 5 minutes.
const DEFAULT_WINDOW_MINUTES: i64 = 5;

struct InputContract {
    query: ParamSpec,
    start_time: ParamSpec,
    end_time: ParamSpec,
    max_count: ParamSpec,
}

fn input_contract() -> InputContract {
    let mut set = ParamSet::new();
    InputContract {
        query: set.optional("QUERY", DataType::String, "Query string in Splunk search language"),
        start_time: set.optional("START_TIME", DataType::Int, "Start time in epoch format"),
        end_time: set.optional("END_TIME", DataType::Int, "End time in epoch format"),
        max_count: set.optional("MAX_COUNT", DataType::Int, "Maximum number of results"),
    }
}

/// One configured Splunk connector instance.
pub struct SplunkConnector {
    auth: DelegatedBasicAuth,
    job_config: JobConfig,
}

impl SplunkConnector {
    /// Builds the connector from connection parameters. A missing required
    /// parameter is a configuration error, not a network error.
    pub fn from_context(ctx: &AuthContext) -> Result<Self, SkillError> {
        let auth = DelegatedBasicAuth::from_context(ctx)?;
        Ok(Self {
            auth,
            job_config: JobConfig::default(),
        })
    }

    /// Overrides the poll cadence and deadline (used by tests).
    pub fn with_job_config(mut self, job_config: JobConfig) -> Self {
        self.job_config = job_config;
        self
    }

    /// Runs the search skill and packages the uniform response.
    pub async fn execute_query(&self, inputs: &RawInputs) -> Value {
        respond(RESULTS_KEY, self.run(inputs).await)
    }

    async fn run(&self, inputs: &RawInputs) -> Result<Value, SkillError> {
        let contract = input_contract();

        let query = match contract.query.read_value(inputs)? {
            ParamValue::Str(s) => s,
            _ => String::new(),
        };
        let start_time = contract.start_time.read_value(inputs)?.as_int();
        let end_time = contract.end_time.read_value(inputs)?.as_int();
        let max_count = contract.max_count.read_value(inputs)?.as_int();

        let range = match start_time {
            Some(start) => TimeRange::from_epochs(start, end_time),
            None => TimeRange::last_minutes(DEFAULT_WINDOW_MINUTES),
        };

        let search = format!("search {}", query);
        let backend = SplunkBackend::new(&self.auth, max_count);
        let executor = JobExecutor::with_config(backend, self.job_config.clone());

        let results = executor.run(&search, &range).await?;
        Ok(results)
    }
}

/// Skill entry point invoked by the hosting platform.
pub async fn run_skill(input_params: &RawInputs, auth_params: &AuthContext) -> Value {
    match SplunkConnector::from_context(auth_params) {
        Ok(connector) => connector.execute_query(input_params).await,
        Err(e) => respond(RESULTS_KEY, Err(e)),
    }
}

/// Verifies the configured credentials for the operator UI.
pub async fn test_authentication(auth_params: &AuthContext) -> u16 {
    tether::skill::test_authentication::<DelegatedBasicAuth>(auth_params).await
}

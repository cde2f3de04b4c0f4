//! Remote job execution: submit, poll, fetch.
//!
//! Drives an upstream system that runs work asynchronously. One request
//! creates the job, a fixed-cadence poll loop watches its status under a
//! global deadline, and one request retrieves the finished output. Nothing
//! is retried: a failed submission, an explicit FAILED status, or an HTTP
//! error on the result fetch is terminal for the invocation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};


/// Lifecycle state of a remote job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Running,
    Done,
    Failed,
    TimedOut,
}

impl JobState {
    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed | JobState::TimedOut)
    }
}

/// Handle to one submitted job.
///
/// Created on successful submission, mutated only by the polling loop, and
/// dropped once results are fetched or a terminal failure is reported. There
/// is no persistent job registry.
#[derive(Clone, Debug)]
pub struct JobHandle {
    /// Opaque upstream job identifier.
    pub id: String,
    /// Wall-clock submission time, for reporting.
    pub submitted_at: DateTime<Utc>,
    /// Monotonic submission instant; the deadline is measured from here,
    /// never from the last poll.
    started: Instant,
    pub state: JobState,
}

impl JobHandle {
    fn new(id: String) -> Self {
        Self {
            id,
            submitted_at: Utc::now(),
            started: Instant::now(),
            state: JobState::Submitted,
        }
    }

    /// Elapsed wall-clock time since submission.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Time window a job query runs over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeRange {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

impl TimeRange {
    /// Window ending now and starting `minutes` ago.
    pub fn last_minutes(minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            earliest: now - chrono::Duration::minutes(minutes),
            latest: now,
        }
    }

    /// Window between two epoch-second timestamps. The end defaults to now
    /// when not supplied.
    pub fn from_epochs(start: i64, end: Option<i64>) -> Self {
        let latest = end
            .and_then(|e| DateTime::<Utc>::from_timestamp(e, 0))
            .unwrap_or_else(Utc::now);
        let earliest = DateTime::<Utc>::from_timestamp(start, 0).unwrap_or_else(Utc::now);
        Self { earliest, latest }
    }

    /// RFC 3339 rendering of the window bounds (second precision, UTC).
    pub fn format_bounds(&self) -> (String, String) {
        (format_rfc3339(&self.earliest), format_rfc3339(&self.latest))
    }
}

/// Formats a datetime as an RFC 3339 compliant string, e.g.
/// `2024-01-15T10:30:00Z`.
pub fn format_rfc3339(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Transport-level failure reported by a [`JobBackend`].
///
/// The backend reports what went wrong on the wire; the executor classifies
/// it into the lifecycle-specific [`JobError`] kind for the phase it
/// happened in.
#[derive(Debug)]
pub enum BackendError {
    /// The upstream answered with a non-success HTTP status.
    Status { status: u16, body: String },
    /// The request could not be sent or its response not parsed.
    Transport(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Status { status, body } => {
                write!(f, "upstream returned status {}: {}", status, body)
            }
            BackendError::Transport(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Transport(e.to_string())
    }
}

/// Job lifecycle failures. Kinds are distinct and never merged so a caller
/// can tell "could not start", "upstream rejected the work", and "upstream
/// never finished in time" apart.
#[derive(Debug)]
pub enum JobError {
    /// The submission request failed; the job never started.
    Submission(BackendError),
    /// The upstream reported an explicit failure status.
    Failed { id: String },
    /// The deadline elapsed before a terminal status was observed.
    Timeout { id: String, elapsed: Duration },
    /// A status poll failed on the wire.
    Poll { id: String, source: BackendError },
    /// The result fetch failed after the job completed.
    ResultFetch { id: String, source: BackendError },
}

impl JobError {
    /// Stable kind name for diagnostic logging.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Submission(_) => "submission",
            JobError::Failed { .. } => "job_failed",
            JobError::Timeout { .. } => "job_timeout",
            JobError::Poll { .. } => "status_poll",
            JobError::ResultFetch { .. } => "result_fetch",
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::Submission(e) => write!(f, "Job submission failed: {}", e),
            JobError::Failed { id } => write!(f, "Job {} failed upstream", id),
            JobError::Timeout { id, elapsed } => {
                write!(
                    f,
                    "Job {} exceeded the time limit after {}s",
                    id,
                    elapsed.as_secs()
                )
            }
            JobError::Poll { id, source } => {
                write!(f, "Status poll for job {} failed: {}", id, source)
            }
            JobError::ResultFetch { id, source } => {
                write!(f, "Result fetch for job {} failed: {}", id, source)
            }
        }
    }
}

impl std::error::Error for JobError {}

/// Port to the upstream job API: one submit endpoint, one status endpoint,
/// one results endpoint. The core assumes nothing about the upstream shape
/// beyond a status word with at least one success and one failure value.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Creates the remote job, returning its opaque identifier.
    async fn submit(&self, query: &str, range: &TimeRange) -> Result<String, BackendError>;

    /// Reads the upstream's current status word for the job.
    async fn status(&self, job_id: &str) -> Result<String, BackendError>;

    /// Retrieves the completed job's output.
    async fn fetch(&self, job_id: &str) -> Result<Value, BackendError>;
}

/// Poll cadence, deadline, and status vocabulary for one executor.
#[derive(Clone, Debug)]
pub struct JobConfig {
    /// Fixed wait between status polls.
    pub poll_interval: Duration,
    /// Global ceiling on wall-clock time since submission.
    pub deadline: Duration,
    /// Upstream status words that mean the job completed.
    pub done_states: Vec<String>,
    /// Upstream status words that mean the job failed.
    pub failed_states: Vec<String>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            deadline: Duration::from_secs(3600),
            done_states: vec!["DONE".to_string()],
            failed_states: vec!["FAILED".to_string()],
        }
    }
}

/// Drives one remote job to completion or to a bounded failure.
pub struct JobExecutor<B: JobBackend> {
    backend: B,
    config: JobConfig,
}

impl<B: JobBackend> JobExecutor<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, JobConfig::default())
    }

    pub fn with_config(backend: B, config: JobConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Submits the job. Any backend failure is terminal; nothing is retried.
    pub async fn submit(&self, query: &str, range: &TimeRange) -> Result<JobHandle, JobError> {
        let id = self
            .backend
            .submit(query, range)
            .await
            .map_err(JobError::Submission)?;

        tracing::info!(job_id = %id, "Job submitted");
        Ok(JobHandle::new(id))
    }

    /// Polls the job at the configured cadence until it reaches a terminal
    /// state or the deadline elapses.
    ///
    /// The deadline is measured from the submission instant, checked before
    /// each wait-and-poll; once it fails no further poll is issued. An
    /// explicit failed status fails immediately; any unrecognized status
    /// keeps the loop waiting. Each wait is a cancellable timed suspension,
    /// so an enclosing timeout can abort between polls.
    pub async fn await_completion(&self, handle: &mut JobHandle) -> Result<(), JobError> {
        loop {
            let elapsed = handle.elapsed();
            if elapsed >= self.config.deadline {
                handle.state = JobState::TimedOut;
                tracing::warn!(
                    job_id = %handle.id,
                    elapsed_secs = elapsed.as_secs(),
                    "Job exceeded deadline, aborting poll loop"
                );
                return Err(JobError::Timeout {
                    id: handle.id.clone(),
                    elapsed,
                });
            }

            tokio::time::sleep(self.config.poll_interval).await;

            let status = self.backend.status(&handle.id).await.map_err(|source| {
                JobError::Poll {
                    id: handle.id.clone(),
                    source,
                }
            })?;

            tracing::debug!(job_id = %handle.id, status = %status, "Polled job status");

            if self.config.done_states.iter().any(|s| s == &status) {
                handle.state = JobState::Done;
                return Ok(());
            }
            if self.config.failed_states.iter().any(|s| s == &status) {
                handle.state = JobState::Failed;
                return Err(JobError::Failed {
                    id: handle.id.clone(),
                });
            }

            // Unknown status words are treated as still running: keep
            // waiting rather than fail on transient upstream vocabulary.
            handle.state = JobState::Running;
        }
    }

    /// Fetches the completed job's output. Valid only once the handle is in
    /// `Done`; an HTTP failure here is terminal.
    pub async fn fetch_result(&self, handle: &JobHandle) -> Result<Value, JobError> {
        if handle.state != JobState::Done {
            return Err(JobError::ResultFetch {
                id: handle.id.clone(),
                source: BackendError::Transport(format!(
                    "job is in state {:?}, results exist only after DONE",
                    handle.state
                )),
            });
        }

        self.backend
            .fetch(&handle.id)
            .await
            .map_err(|source| JobError::ResultFetch {
                id: handle.id.clone(),
                source,
            })
    }

    /// Full driver: submit, await completion, fetch results.
    pub async fn run(&self, query: &str, range: &TimeRange) -> Result<Value, JobError> {
        let mut handle = self.submit(query, range).await?;
        self.await_completion(&mut handle).await?;
        self.fetch_result(&handle).await
    }
}

//! Scheduler trait: submit an inference job, get its status.

use async_trait::async_trait;
use haicor_types::{GraphRequest, PathRequest, StepRequest};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler error: {0}")]
    Other(String),
}

/// Kind of inference job; also the `/api/{kind}` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobType {
    Step,
    Path,
    Graph,
}

impl JobType {
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::Step => "step",
            JobType::Path => "path",
            JobType::Graph => "graph",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queued inference request.
#[derive(Debug, Clone)]
pub enum JobSpec {
    Step(StepRequest),
    Path(PathRequest),
    Graph(GraphRequest),
}

impl JobSpec {
    pub fn job_type(&self) -> JobType {
        match self {
            JobSpec::Step(_) => JobType::Step,
            JobSpec::Path(_) => JobType::Path,
            JobSpec::Graph(_) => JobType::Graph,
        }
    }
}

/// Current state of a job as served to pollers.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub job_id: String,
    pub job_type: JobType,
    /// Wire state tag (`waiting`, `running`, `f0`, ..., `stopped`).
    pub state: String,
    /// Serialized hits; set once the job stopped successfully.
    pub result: Option<serde_json::Value>,
    /// Reasoner failure, if the job stopped without a result.
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Contract: `get_status` returns `Ok(None)` when the job id is unknown for that job type.
/// The API layer maps `Ok(None)` to HTTP 404.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Queue a job; returns its id. The job runs in a worker.
    async fn submit(&self, spec: JobSpec) -> Result<String, SchedulerError>;

    async fn get_status(
        &self,
        job_type: JobType,
        job_id: &str,
    ) -> Result<Option<JobSnapshot>, SchedulerError>;
}

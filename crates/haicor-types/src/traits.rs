//! Traits for the API transport, the reasoner backend and story storage.

use crate::{
    GraphRequest, PathHit, PathRequest, SearchPhase, StepHit, StepRequest, Story, StoryTitle,
};
use async_trait::async_trait;
use std::time::Duration;

/// Raw JSON exchange with the reasoning backend.
///
/// Paths are absolute on the backend, e.g. `/api/step` or `/api/story/{uuid}`.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// `GET {path}`; returns the decoded response body.
    async fn get_json(&self, path: &str) -> Result<serde_json::Value, TransportError>;

    /// `POST {path}` with a JSON `body`; returns the decoded response body.
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, TransportError>;
}

/// Receives phase changes of a running search job.
#[async_trait]
pub trait PhaseSink: Send + Sync {
    async fn report(&self, phase: SearchPhase);
}

/// Inference backend (the language model lives behind this).
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Single-step inference; hits sorted by score, best first.
    async fn step(&self, req: &StepRequest) -> Result<Vec<StepHit>, ReasonerError>;

    /// Paths from `req.source` to `req.target`, reporting search phases as they start.
    async fn path(
        &self,
        req: &PathRequest,
        sink: &dyn PhaseSink,
    ) -> Result<Vec<PathHit>, ReasonerError>;

    /// Paths ending at `req.target`, reporting search phases as they start.
    async fn graph(
        &self,
        req: &GraphRequest,
        sink: &dyn PhaseSink,
    ) -> Result<Vec<PathHit>, ReasonerError>;
}

/// Read access to the story catalog.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// All stories as `(uuid, title)` pairs, sorted by title.
    async fn list(&self) -> Result<Vec<StoryTitle>, StoryStoreError>;

    /// One story by uuid; `Ok(None)` when unknown.
    async fn get(&self, uuid: &str) -> Result<Option<Story>, StoryStoreError>;
}

/// Failure of a single request/response exchange. Transient from the poll loop's point of view.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Outcome of submitting and tracking an inference job.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job submission failed: {0}")]
    Submission(String),
    #[error("status polling failed: {0}")]
    Transport(#[from] TransportError),
    #[error("job stopped without a result")]
    MissingResult,
    #[error("job result has an unexpected shape: {0}")]
    MalformedResult(String),
    #[error(transparent)]
    UnrecognizedState(#[from] crate::UnrecognizedState),
    #[error("job still running after {polls} polls ({elapsed:?})")]
    TimedOut { polls: u32, elapsed: Duration },
    #[error("job tracking cancelled")]
    Cancelled,
}

/// Story catalog calls made by the client.
#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    #[error("story request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("invalid story range: {0:?}")]
    InvalidRange(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ReasonerError {
    #[error("reasoner error: {0}")]
    Other(String),
    #[error("empty context")]
    EmptyContext,
}

#[derive(Debug, thiserror::Error)]
pub enum StoryStoreError {
    #[error("story store error: {0}")]
    Other(String),
}

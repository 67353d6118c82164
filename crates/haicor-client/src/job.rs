//! Per-kind bindings of the generic poll engine: endpoint, phase vocabulary, progress table.

use haicor_types::{
    GraphRequest, PathHit, PathRequest, Progress, SearchPhase, StepHit, StepPhase, StepRequest,
    UnrecognizedState,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// One kind of inference job.
pub trait JobKind {
    type Request: Serialize + Sync;
    type Phase: FromStr<Err = UnrecognizedState> + Display + Copy + Send;
    type Output: DeserializeOwned + Send;

    /// Path segment under `/api/`.
    const ENDPOINT: &'static str;
    /// Inter-poll delay when the caller does not override it.
    const DEFAULT_INTERVAL: Duration;

    fn progress(request: &Self::Request, phase: Self::Phase) -> Progress;

    fn is_terminal(phase: Self::Phase) -> bool;
}

/// Single-step inference.
#[derive(Debug, Clone, Copy)]
pub struct StepJob;

/// Path inference between a source and a target.
#[derive(Debug, Clone, Copy)]
pub struct PathJob;

/// Graph inference toward a target.
#[derive(Debug, Clone, Copy)]
pub struct GraphJob;

impl JobKind for StepJob {
    type Request = StepRequest;
    type Phase = StepPhase;
    type Output = Vec<StepHit>;

    const ENDPOINT: &'static str = "step";
    const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

    fn progress(_request: &StepRequest, phase: StepPhase) -> Progress {
        phase.progress()
    }

    fn is_terminal(phase: StepPhase) -> bool {
        phase.is_terminal()
    }
}

impl JobKind for PathJob {
    type Request = PathRequest;
    type Phase = SearchPhase;
    type Output = Vec<PathHit>;

    const ENDPOINT: &'static str = "path";
    const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

    fn progress(request: &PathRequest, phase: SearchPhase) -> Progress {
        phase.progress(request.length)
    }

    fn is_terminal(phase: SearchPhase) -> bool {
        phase.is_terminal()
    }
}

impl JobKind for GraphJob {
    type Request = GraphRequest;
    type Phase = SearchPhase;
    type Output = Vec<PathHit>;

    const ENDPOINT: &'static str = "graph";
    const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

    fn progress(request: &GraphRequest, phase: SearchPhase) -> Progress {
        phase.progress(request.length)
    }

    fn is_terminal(phase: SearchPhase) -> bool {
        phase.is_terminal()
    }
}

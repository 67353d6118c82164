//! Job phase tags and their translation into progress estimates.
//!
//! The backend reports job state as a short string tag. Tags are decoded once at the
//! boundary into [`StepPhase`] or [`SearchPhase`] and re-encoded with `Display`.

use std::fmt;
use std::str::FromStr;

/// A state tag outside the vocabulary of the job kind it was received for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized job state: {0:?}")]
pub struct UnrecognizedState(pub String);

/// Completion estimate shown to the operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// In `[0, 1]`; exactly `1.0` once the job is terminal.
    pub fraction: f64,
    pub message: String,
}

impl Progress {
    fn new(fraction: f64, message: impl Into<String>) -> Self {
        Self {
            fraction,
            message: message.into(),
        }
    }
}

/// State of a step job (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    Waiting,
    Running,
    Stopped,
}

impl StepPhase {
    pub fn as_tag(self) -> &'static str {
        match self {
            StepPhase::Waiting => "waiting",
            StepPhase::Running => "running",
            StepPhase::Stopped => "stopped",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == StepPhase::Stopped
    }

    pub fn progress(self) -> Progress {
        match self {
            StepPhase::Waiting => Progress::new(1.0 / 3.0, "Submitted"),
            StepPhase::Running => Progress::new(2.0 / 3.0, "Reasoning"),
            StepPhase::Stopped => Progress::new(1.0, "Completed"),
        }
    }
}

impl FromStr for StepPhase {
    type Err = UnrecognizedState;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "waiting" => Ok(StepPhase::Waiting),
            "running" => Ok(StepPhase::Running),
            "stopped" => Ok(StepPhase::Stopped),
            _ => Err(UnrecognizedState(tag.to_string())),
        }
    }
}

impl fmt::Display for StepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// State of a path or graph job.
///
/// Wire tags: `waiting`, `f<N>`, `b<N>`, `c`, `s`, `stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Waiting,
    /// Forward search, step N.
    Forward(u32),
    /// Backward search, step N.
    Backward(u32),
    Connecting,
    Searching,
    Stopped,
}

/// Total progress units of a search job with the given path length: `4 + 2 * length`.
/// Widened so any `u32` length fits.
pub fn total_steps(length: u32) -> u64 {
    4 + 2 * u64::from(length)
}

impl SearchPhase {
    pub fn is_terminal(self) -> bool {
        self == SearchPhase::Stopped
    }

    /// Progress of this phase for a job searching paths of `length` hops.
    pub fn progress(self, length: u32) -> Progress {
        let total = total_steps(length) as f64;
        let length = f64::from(length);
        let at = |units: f64| (units / total).min(1.0);
        match self {
            SearchPhase::Waiting => Progress::new(at(1.0), "Submitted"),
            SearchPhase::Forward(n) => {
                Progress::new(at(1.0 + f64::from(n)), format!("Forward search {}", n))
            }
            SearchPhase::Backward(n) => Progress::new(
                at(1.0 + length + f64::from(n)),
                format!("Backward search {}", n),
            ),
            SearchPhase::Connecting => Progress::new(at(1.0 + 2.0 * length), "Connecting"),
            SearchPhase::Searching => Progress::new(at(2.0 + 2.0 * length), "Searching"),
            SearchPhase::Stopped => Progress::new(1.0, "Completed"),
        }
    }
}

fn step_number(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl FromStr for SearchPhase {
    type Err = UnrecognizedState;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let phase = match tag {
            "waiting" => Some(SearchPhase::Waiting),
            "stopped" => Some(SearchPhase::Stopped),
            "c" => Some(SearchPhase::Connecting),
            "s" => Some(SearchPhase::Searching),
            _ => {
                if let Some(rest) = tag.strip_prefix('f') {
                    step_number(rest).map(SearchPhase::Forward)
                } else if let Some(rest) = tag.strip_prefix('b') {
                    step_number(rest).map(SearchPhase::Backward)
                } else {
                    None
                }
            }
        };
        phase.ok_or_else(|| UnrecognizedState(tag.to_string()))
    }
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchPhase::Waiting => f.write_str("waiting"),
            SearchPhase::Forward(n) => write!(f, "f{}", n),
            SearchPhase::Backward(n) => write!(f, "b{}", n),
            SearchPhase::Connecting => f.write_str("c"),
            SearchPhase::Searching => f.write_str("s"),
            SearchPhase::Stopped => f.write_str("stopped"),
        }
    }
}

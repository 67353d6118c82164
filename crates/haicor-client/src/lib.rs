//! Client for the HAICOR reasoning backend.
//!
//! Inference jobs are submitted once and then polled until the backend reports `stopped`;
//! every poll is translated into a [`ProgressUpdate`] for the caller.

mod catalog;
mod client;
mod config;
mod draft;
mod http;
mod job;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
mod poll;

pub use catalog::{StoryCatalog, StoryRange, PAGE_SIZE};
pub use client::ReasonClient;
pub use config::ClientConfig;
pub use draft::{format_score, Inference, StoryDraft};
pub use haicor_types::{ApiTransport, JobError, StoryError, TransportError};
pub use http::HttpTransport;
pub use job::{GraphJob, JobKind, PathJob, StepJob};
pub use poll::{submit, track, PollPolicy, ProgressUpdate, RetryPolicy};

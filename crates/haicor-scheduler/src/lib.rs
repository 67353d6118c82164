//! Inference job scheduling: submit returns a job id, status can be polled.

mod lexical;
mod memory;
mod trait_;

pub use lexical::{LexicalReasoner, MAX_SEARCH_LENGTH};
pub use memory::{InMemoryScheduler, DEFAULT_RETENTION};
pub use trait_::{JobSnapshot, JobSpec, JobType, Scheduler, SchedulerError};

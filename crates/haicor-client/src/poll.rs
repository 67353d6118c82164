//! Job submission and the status polling loop.

use crate::job::JobKind;
use haicor_types::{ApiTransport, JobCreated, JobError, JobHandle, JobStatus, TransportError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Bounded exponential backoff for failed status polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive failures tolerated before the loop gives up.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after failure number `attempt` (0-based): `base * 2^attempt`, capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.min(20))
            .min(self.max_delay)
    }
}

/// How a job is polled after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between successful polls.
    pub interval: Duration,
    /// Give up once this much time has passed since polling started.
    pub max_wait: Option<Duration>,
    /// Give up after this many status requests.
    pub max_polls: Option<u32>,
    pub retry: RetryPolicy,
}

impl PollPolicy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_wait: None,
            max_polls: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Default policy for a job kind.
    pub fn for_kind<K: JobKind>() -> Self {
        Self::new(K::DEFAULT_INTERVAL)
    }
}

/// One progress report, delivered once per successful poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// State tag exactly as the backend sent it.
    pub tag: String,
    pub fraction: f64,
    pub message: String,
}

/// Submit `request` and return the backend's job handle. Never retried.
pub async fn submit<K: JobKind>(
    transport: &dyn ApiTransport,
    request: &K::Request,
) -> Result<JobHandle, JobError> {
    let body =
        serde_json::to_value(request).map_err(|e| JobError::Submission(e.to_string()))?;
    let res = transport
        .post_json(&format!("/api/{}", K::ENDPOINT), &body)
        .await
        .map_err(|e| JobError::Submission(e.to_string()))?;
    let created: JobCreated =
        serde_json::from_value(res).map_err(|e| JobError::Submission(e.to_string()))?;
    match created.uuid {
        Some(handle) if !handle.as_str().is_empty() => {
            tracing::info!(kind = K::ENDPOINT, job = %handle, "job submitted");
            Ok(handle)
        }
        _ => Err(JobError::Submission(
            "response is missing the job uuid".to_string(),
        )),
    }
}

async fn fetch_status<K: JobKind>(
    transport: &dyn ApiTransport,
    handle: &JobHandle,
) -> Result<JobStatus<serde_json::Value>, TransportError> {
    let res = transport
        .get_json(&format!(
            "/api/{}/{}",
            K::ENDPOINT,
            urlencoding::encode(handle.as_str())
        ))
        .await?;
    serde_json::from_value(res).map_err(|e| TransportError::Decode(e.to_string()))
}

fn decode_result<K: JobKind>(result: Option<serde_json::Value>) -> Result<K::Output, JobError> {
    let value = result.ok_or(JobError::MissingResult)?;
    serde_json::from_value(value).map_err(|e| JobError::MalformedResult(e.to_string()))
}

/// Poll `handle` until the job stops, reporting progress after every successful poll.
///
/// Failed polls are retried per `policy.retry`; an unrecognized state tag ends the loop with
/// [`JobError::UnrecognizedState`]. `cancel` is observed before every request and while waiting.
pub async fn track<K, F>(
    transport: &dyn ApiTransport,
    request: &K::Request,
    handle: &JobHandle,
    policy: &PollPolicy,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<K::Output, JobError>
where
    K: JobKind,
    F: FnMut(&ProgressUpdate),
{
    let started = Instant::now();
    let mut polls: u32 = 0;
    let mut failures: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        let out_of_polls = policy.max_polls.is_some_and(|max| polls >= max);
        let out_of_time = policy
            .max_wait
            .is_some_and(|max| started.elapsed() >= max);
        if out_of_polls || out_of_time {
            return Err(JobError::TimedOut {
                polls,
                elapsed: started.elapsed(),
            });
        }

        polls += 1;
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            res = fetch_status::<K>(transport, handle) => res,
        };

        let delay = match fetched {
            Ok(status) => {
                failures = 0;
                let phase: K::Phase = status.state.parse()?;
                let progress = K::progress(request, phase);
                tracing::debug!(
                    kind = K::ENDPOINT,
                    job = %handle,
                    state = %phase,
                    fraction = progress.fraction,
                    "job status"
                );
                on_progress(&ProgressUpdate {
                    tag: status.state,
                    fraction: progress.fraction,
                    message: progress.message,
                });
                if K::is_terminal(phase) {
                    return decode_result::<K>(status.result);
                }
                policy.interval
            }
            Err(e) => {
                if failures >= policy.retry.max_retries {
                    return Err(JobError::Transport(e));
                }
                let delay = policy.retry.delay(failures);
                failures += 1;
                tracing::warn!(
                    kind = K::ENDPOINT,
                    job = %handle,
                    attempt = failures,
                    error = %e,
                    "status poll failed, retrying in {:?}",
                    delay
                );
                delay
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

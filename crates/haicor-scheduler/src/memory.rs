//! In-memory scheduler: single queue + one worker, job state in a map.

use crate::{JobSnapshot, JobSpec, JobType, Scheduler, SchedulerError};
use async_trait::async_trait;
use chrono::Utc;
use haicor_types::{PhaseSink, Reasoner, ReasonerError, SearchPhase, StepPhase};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

/// How long a stopped job stays readable when no retention is given.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(600);

struct JobEntry {
    snapshot: JobSnapshot,
    stopped_at: Option<Instant>,
}

impl JobEntry {
    fn expired(&self, now: Instant, retention: Duration) -> bool {
        self.stopped_at
            .is_some_and(|at| now.saturating_duration_since(at) >= retention)
    }
}

type JobMap = Arc<RwLock<HashMap<String, JobEntry>>>;

/// In-memory scheduler: queues inference jobs, one worker runs them on the reasoner and
/// updates job state. Queued jobs report `waiting`. Stopped jobs are dropped once they have
/// been stopped for longer than the retention window.
pub struct InMemoryScheduler {
    jobs: JobMap,
    tx: mpsc::UnboundedSender<(String, JobSpec)>,
    retention: Duration,
}

/// Publishes search phases of one job into the job map.
struct JobPhaseSink {
    jobs: JobMap,
    job_id: String,
}

#[async_trait]
impl PhaseSink for JobPhaseSink {
    async fn report(&self, phase: SearchPhase) {
        set_state(&self.jobs, &self.job_id, phase.to_string()).await;
    }
}

async fn set_state(jobs: &JobMap, job_id: &str, state: String) {
    let mut guard = jobs.write().await;
    if let Some(entry) = guard.get_mut(job_id) {
        entry.snapshot.state = state;
        entry.snapshot.updated_at = Utc::now().to_rfc3339();
    }
}

async fn sweep(jobs: &JobMap, retention: Duration) {
    let now = Instant::now();
    let mut guard = jobs.write().await;
    let before = guard.len();
    guard.retain(|_, entry| !entry.expired(now, retention));
    let evicted = before - guard.len();
    if evicted > 0 {
        tracing::debug!(evicted, "expired jobs evicted");
    }
}

fn to_result<T: Serialize>(
    res: Result<Vec<T>, ReasonerError>,
) -> Result<serde_json::Value, String> {
    let hits = res.map_err(|e| e.to_string())?;
    serde_json::to_value(hits).map_err(|e| e.to_string())
}

async fn run_job(
    reasoner: &dyn Reasoner,
    jobs: &JobMap,
    job_id: &str,
    spec: JobSpec,
) -> Result<serde_json::Value, String> {
    let sink = JobPhaseSink {
        jobs: Arc::clone(jobs),
        job_id: job_id.to_string(),
    };
    match spec {
        JobSpec::Step(req) => {
            set_state(jobs, job_id, StepPhase::Running.to_string()).await;
            to_result(reasoner.step(&req).await)
        }
        JobSpec::Path(req) => to_result(reasoner.path(&req, &sink).await),
        JobSpec::Graph(req) => to_result(reasoner.graph(&req, &sink).await),
    }
}

impl InMemoryScheduler {
    /// Create scheduler and spawn worker. Worker runs jobs on the given reasoner.
    pub fn new(reasoner: Arc<dyn Reasoner + Send + Sync>) -> Self {
        Self::with_retention(reasoner, DEFAULT_RETENTION)
    }

    /// Like [`Self::new`]; stopped jobs stay readable for `retention`.
    pub fn with_retention(
        reasoner: Arc<dyn Reasoner + Send + Sync>,
        retention: Duration,
    ) -> Self {
        let jobs: JobMap = Arc::new(RwLock::new(HashMap::new()));
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, JobSpec)>();

        let jobs_clone = Arc::clone(&jobs);
        tokio::spawn(async move {
            while let Some((job_id, spec)) = rx.recv().await {
                let job_type = spec.job_type();
                let outcome = run_job(reasoner.as_ref(), &jobs_clone, &job_id, spec).await;
                let (result, error) = match outcome {
                    Ok(v) => (Some(v), None),
                    Err(e) => {
                        tracing::warn!(
                            job_id = %job_id,
                            kind = %job_type,
                            error = %e,
                            "job failed"
                        );
                        (None, Some(e))
                    }
                };
                {
                    let mut guard = jobs_clone.write().await;
                    if let Some(entry) = guard.get_mut(&job_id) {
                        let job = &mut entry.snapshot;
                        job.state = StepPhase::Stopped.to_string();
                        job.updated_at = Utc::now().to_rfc3339();
                        job.result = result;
                        job.error = error;
                        entry.stopped_at = Some(Instant::now());
                    }
                }
                tracing::info!(job_id = %job_id, kind = %job_type, "job stopped");
                sweep(&jobs_clone, retention).await;
            }
        });

        Self {
            jobs,
            tx,
            retention,
        }
    }

    fn now_iso(&self) -> String {
        Utc::now().to_rfc3339()
    }
}

#[async_trait]
impl Scheduler for InMemoryScheduler {
    async fn submit(&self, spec: JobSpec) -> Result<String, SchedulerError> {
        let job_id = Uuid::new_v4().to_string();
        let now = self.now_iso();
        let job = JobSnapshot {
            job_id: job_id.clone(),
            job_type: spec.job_type(),
            state: StepPhase::Waiting.to_string(),
            result: None,
            error: None,
            created_at: now.clone(),
            updated_at: now,
        };
        sweep(&self.jobs, self.retention).await;
        {
            let mut guard = self.jobs.write().await;
            guard.insert(
                job_id.clone(),
                JobEntry {
                    snapshot: job,
                    stopped_at: None,
                },
            );
        }
        self.tx
            .send((job_id.clone(), spec))
            .map_err(|_| SchedulerError::Other("worker channel closed".to_string()))?;
        Ok(job_id)
    }

    async fn get_status(
        &self,
        job_type: JobType,
        job_id: &str,
    ) -> Result<Option<JobSnapshot>, SchedulerError> {
        let now = Instant::now();
        let guard = self.jobs.read().await;
        Ok(guard
            .get(job_id)
            .filter(|entry| entry.snapshot.job_type == job_type)
            .filter(|entry| !entry.expired(now, self.retention))
            .map(|entry| entry.snapshot.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haicor_types::{GraphRequest, PathHit, PathRequest, StepHit, StepRequest};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Step and path jobs block until the gate is released; path jobs report `f0` first.
    struct GatedReasoner {
        gate: Notify,
    }

    #[async_trait]
    impl Reasoner for GatedReasoner {
        async fn step(&self, req: &StepRequest) -> Result<Vec<StepHit>, ReasonerError> {
            self.gate.notified().await;
            if req.question == "fail" {
                return Err(ReasonerError::Other("model unavailable".into()));
            }
            Ok(vec![StepHit {
                score: 0.5,
                text: req.question.clone(),
            }])
        }

        async fn path(
            &self,
            _req: &PathRequest,
            sink: &dyn PhaseSink,
        ) -> Result<Vec<PathHit>, ReasonerError> {
            sink.report(SearchPhase::Forward(0)).await;
            self.gate.notified().await;
            Ok(vec![])
        }

        async fn graph(
            &self,
            _req: &GraphRequest,
            _sink: &dyn PhaseSink,
        ) -> Result<Vec<PathHit>, ReasonerError> {
            Ok(vec![])
        }
    }

    async fn wait_for_state(
        s: &InMemoryScheduler,
        t: JobType,
        id: &str,
        state: &str,
    ) -> JobSnapshot {
        for _ in 0..100 {
            let job = s.get_status(t, id).await.unwrap().unwrap();
            if job.state == state {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} never reached {}", id, state);
    }

    fn scheduler() -> (InMemoryScheduler, Arc<GatedReasoner>) {
        let reasoner = Arc::new(GatedReasoner {
            gate: Notify::new(),
        });
        (InMemoryScheduler::new(reasoner.clone()), reasoner)
    }

    #[tokio::test]
    async fn step_job_runs_to_stopped() {
        let (s, reasoner) = scheduler();
        let id = s
            .submit(JobSpec::Step(StepRequest::new("q", vec!["a".into()])))
            .await
            .unwrap();
        wait_for_state(&s, JobType::Step, &id, "running").await;
        reasoner.gate.notify_one();
        let job = wait_for_state(&s, JobType::Step, &id, "stopped").await;
        assert_eq!(job.result.unwrap(), serde_json::json!([[0.5, "q"]]));
    }

    #[tokio::test]
    async fn queued_job_waits_behind_running_one() {
        let (s, reasoner) = scheduler();
        let first = s
            .submit(JobSpec::Step(StepRequest::new("one", vec![])))
            .await
            .unwrap();
        let second = s
            .submit(JobSpec::Step(StepRequest::new("two", vec![])))
            .await
            .unwrap();
        wait_for_state(&s, JobType::Step, &first, "running").await;
        let queued = s.get_status(JobType::Step, &second).await.unwrap().unwrap();
        assert_eq!(queued.state, "waiting");
        reasoner.gate.notify_one();
        wait_for_state(&s, JobType::Step, &second, "running").await;
        reasoner.gate.notify_one();
        wait_for_state(&s, JobType::Step, &second, "stopped").await;
    }

    #[tokio::test]
    async fn failed_job_stops_without_result() {
        let (s, reasoner) = scheduler();
        let id = s
            .submit(JobSpec::Step(StepRequest::new("fail", vec![])))
            .await
            .unwrap();
        wait_for_state(&s, JobType::Step, &id, "running").await;
        reasoner.gate.notify_one();
        let job = wait_for_state(&s, JobType::Step, &id, "stopped").await;
        assert!(job.result.is_none());
        assert!(job.error.unwrap().contains("model unavailable"));
    }

    #[tokio::test]
    async fn search_job_publishes_phase_tags() {
        let (s, reasoner) = scheduler();
        let id = s
            .submit(JobSpec::Path(PathRequest::new("a", "b", vec![])))
            .await
            .unwrap();
        wait_for_state(&s, JobType::Path, &id, "f0").await;
        reasoner.gate.notify_one();
        let job = wait_for_state(&s, JobType::Path, &id, "stopped").await;
        assert_eq!(job.result.unwrap(), serde_json::json!([]));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_job_expires_after_retention() {
        let reasoner = Arc::new(GatedReasoner {
            gate: Notify::new(),
        });
        let s = InMemoryScheduler::with_retention(reasoner.clone(), Duration::from_secs(60));
        let id = s
            .submit(JobSpec::Step(StepRequest::new("q", vec![])))
            .await
            .unwrap();
        wait_for_state(&s, JobType::Step, &id, "running").await;
        reasoner.gate.notify_one();
        wait_for_state(&s, JobType::Step, &id, "stopped").await;

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(s.get_status(JobType::Step, &id).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(s.get_status(JobType::Step, &id).await.unwrap().is_none());

        let next = s
            .submit(JobSpec::Graph(GraphRequest::new("b", vec![])))
            .await
            .unwrap();
        let guard = s.jobs.read().await;
        assert!(!guard.contains_key(&id));
        assert!(guard.contains_key(&next));
    }

    #[tokio::test(start_paused = true)]
    async fn running_job_is_never_evicted() {
        let (s, _reasoner) = scheduler();
        let id = s
            .submit(JobSpec::Step(StepRequest::new("q", vec![])))
            .await
            .unwrap();
        wait_for_state(&s, JobType::Step, &id, "running").await;
        tokio::time::advance(DEFAULT_RETENTION * 2).await;
        s.submit(JobSpec::Step(StepRequest::new("r", vec![])))
            .await
            .unwrap();
        let job = s.get_status(JobType::Step, &id).await.unwrap().unwrap();
        assert_eq!(job.state, "running");
    }

    #[tokio::test]
    async fn status_is_scoped_by_job_type() {
        let (s, _reasoner) = scheduler();
        let id = s
            .submit(JobSpec::Graph(GraphRequest::new("b", vec![])))
            .await
            .unwrap();
        assert!(s.get_status(JobType::Path, &id).await.unwrap().is_none());
        assert!(s.get_status(JobType::Graph, &id).await.unwrap().is_some());
        assert!(s.get_status(JobType::Graph, "unknown").await.unwrap().is_none());
    }
}

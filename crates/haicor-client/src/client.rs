//! High-level client: story lookups and `submit_and_track` per job kind.

use crate::config::ClientConfig;
use crate::http::HttpTransport;
use crate::job::{GraphJob, JobKind, PathJob, StepJob};
use crate::poll::{self, PollPolicy, ProgressUpdate};
use haicor_types::{
    ApiTransport, GraphRequest, JobError, PathHit, PathRequest, StepHit, StepRequest, Story,
    StoryError, StoryList, StoryTitle, TransportError,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Client for the reasoning backend. Cheap to clone; holds no per-job state.
#[derive(Clone)]
pub struct ReasonClient {
    transport: Arc<dyn ApiTransport>,
    config: ClientConfig,
}

impl ReasonClient {
    pub fn new(transport: Arc<dyn ApiTransport>, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    /// HTTP client for `config.api_url`.
    pub fn http(config: ClientConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(config.api_url.clone()));
        tracing::debug!(base_url = transport.base_url(), "using HTTP backend");
        Self::new(transport, config)
    }

    pub fn from_env() -> Self {
        Self::http(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `(uuid, title)` of every story, sorted by title.
    pub async fn list_stories(&self) -> Result<Vec<StoryTitle>, StoryError> {
        let res = self.transport.get_json("/api/story").await?;
        let list: StoryList =
            serde_json::from_value(res).map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(list.stories)
    }

    /// One story; title and lines are `None` if the backend does not know `uuid`.
    pub async fn get_story(&self, uuid: &str) -> Result<Story, StoryError> {
        let res = self
            .transport
            .get_json(&format!("/api/story/{}", urlencoding::encode(uuid)))
            .await?;
        let story =
            serde_json::from_value(res).map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(story)
    }

    /// Submit a job and poll it to completion with this client's policy for `K`.
    pub async fn submit_and_track<K, F>(
        &self,
        request: &K::Request,
        on_progress: F,
    ) -> Result<K::Output, JobError>
    where
        K: JobKind,
        F: FnMut(&ProgressUpdate),
    {
        let policy = self.config.poll_policy::<K>();
        self.track_with::<K, F>(request, &policy, &CancellationToken::new(), on_progress)
            .await
    }

    /// Like [`submit_and_track`](Self::submit_and_track) with an explicit policy and
    /// cancellation token.
    pub async fn track_with<K, F>(
        &self,
        request: &K::Request,
        policy: &PollPolicy,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<K::Output, JobError>
    where
        K: JobKind,
        F: FnMut(&ProgressUpdate),
    {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        let transport = self.transport.as_ref();
        let handle = poll::submit::<K>(transport, request).await?;
        poll::track::<K, F>(transport, request, &handle, policy, cancel, on_progress).await
    }

    pub async fn step<F: FnMut(&ProgressUpdate)>(
        &self,
        request: &StepRequest,
        on_progress: F,
    ) -> Result<Vec<StepHit>, JobError> {
        self.submit_and_track::<StepJob, F>(request, on_progress).await
    }

    pub async fn path<F: FnMut(&ProgressUpdate)>(
        &self,
        request: &PathRequest,
        on_progress: F,
    ) -> Result<Vec<PathHit>, JobError> {
        self.submit_and_track::<PathJob, F>(request, on_progress).await
    }

    pub async fn graph<F: FnMut(&ProgressUpdate)>(
        &self,
        request: &GraphRequest,
        on_progress: F,
    ) -> Result<Vec<PathHit>, JobError> {
        self.submit_and_track::<GraphJob, F>(request, on_progress).await
    }
}

impl std::fmt::Debug for ReasonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasonClient")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedTransport;
    use serde_json::json;
    use std::time::Duration;

    fn client(t: ScriptedTransport) -> ReasonClient {
        let mut config = ClientConfig::default();
        config.poll_interval = Some(Duration::from_millis(10));
        ReasonClient::new(Arc::new(t), config)
    }

    #[tokio::test(start_paused = true)]
    async fn step_round_trip() {
        let c = client(
            ScriptedTransport::new()
                .on_create(json!({ "uuid": "s1" }))
                .then_status(json!({ "state": "waiting" }))
                .then_status(json!({ "state": "running" }))
                .then_status(json!({ "state": "stopped", "result": [[0.9, "a"]] })),
        );
        let mut tags = Vec::new();
        let hits = c
            .step(&StepRequest::new("q", vec![]), |u| tags.push(u.tag.clone()))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 0.9);
        assert_eq!(hits[0].text, "a");
        assert_eq!(tags, vec!["waiting", "running", "stopped"]);
    }

    #[tokio::test]
    async fn graph_submission_failure_surfaces() {
        let c = client(ScriptedTransport::new().on_create_error(TransportError::Status {
            status: 500,
            body: "boom".into(),
        }));
        let err = c
            .graph(&GraphRequest::new("end", vec![]), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Submission(_)));
    }

    #[tokio::test]
    async fn cancelled_token_skips_submission() {
        let t = Arc::new(ScriptedTransport::new().on_create(json!({ "uuid": "x" })));
        let c = ReasonClient::new(t.clone(), ClientConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let policy = PollPolicy::for_kind::<PathJob>();
        let err = c
            .track_with::<PathJob, _>(
                &PathRequest::new("a", "b", vec![]),
                &policy,
                &cancel,
                |_| {},
            )
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Cancelled));
        assert!(t.calls().is_empty());
    }

    #[tokio::test]
    async fn story_lookups() {
        let c = client(
            ScriptedTransport::new()
                .on_get(
                    "/api/story",
                    json!({ "stories": [["u1", "Apples"], ["u2", "Bikes"]] }),
                )
                .on_get(
                    "/api/story/u1",
                    json!({ "uuid": "u1", "title": "Apples", "lines": ["a", "b", "c", "d", "e"] }),
                ),
        );
        let list = c.list_stories().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].title, "Bikes");
        let story = c.get_story("u1").await.unwrap();
        assert_eq!(story.lines.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn story_uuid_is_one_path_segment() {
        let c = client(ScriptedTransport::new().on_get(
            "/api/story/a%2Fb%3Fc%23d",
            json!({ "uuid": "a/b?c#d", "title": null, "lines": null }),
        ));
        let story = c.get_story("a/b?c#d").await.unwrap();
        assert_eq!(story.uuid, "a/b?c#d");
    }

    #[tokio::test]
    async fn malformed_listing_is_a_decode_error() {
        let c = client(ScriptedTransport::new().on_get("/api/story", json!({ "stories": 3 })));
        let err = c.list_stories().await.unwrap_err();
        assert!(matches!(err, StoryError::Transport(TransportError::Decode(_))));
    }
}

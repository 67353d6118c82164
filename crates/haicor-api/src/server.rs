//! Axum server and routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use haicor_scheduler::{JobSpec, JobType, Scheduler};
use haicor_types::{
    GraphRequest, JobCreated, JobHandle, JobStatus, PathRequest, StepRequest, Story, StoryList,
    StoryStore,
};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub stories: Arc<dyn StoryStore + Send + Sync>,
    pub scheduler: Arc<dyn Scheduler + Send + Sync>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/story", get(handle_story_list))
        .route("/api/story/:uuid", get(handle_story_get))
        .route("/api/step", post(handle_step))
        .route("/api/step/:uuid", get(handle_step_status))
        .route("/api/path", post(handle_path))
        .route("/api/path/:uuid", get(handle_path_status))
        .route("/api/graph", post(handle_graph))
        .route("/api/graph/:uuid", get(handle_graph_status))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_story_list(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<StoryList>) {
    match state.stories.list().await {
        Ok(stories) => (StatusCode::OK, Json(StoryList { stories })),
        Err(e) => {
            tracing::error!(error = %e, "story listing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(StoryList::default()))
        }
    }
}

async fn handle_story_get(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
) -> (StatusCode, Json<Story>) {
    match state.stories.get(&uuid).await {
        Ok(Some(story)) => (StatusCode::OK, Json(story)),
        Ok(None) => (StatusCode::OK, Json(Story::missing(uuid))),
        Err(e) => {
            tracing::error!(uuid = %uuid, error = %e, "story lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(Story::missing(uuid)))
        }
    }
}

async fn submit(state: &AppState, spec: JobSpec) -> (StatusCode, Json<JobCreated>) {
    let job_type = spec.job_type();
    match state.scheduler.submit(spec).await {
        Ok(job_id) => {
            tracing::info!(job_id = %job_id, kind = %job_type, "job queued");
            (
                StatusCode::OK,
                Json(JobCreated {
                    uuid: Some(JobHandle::new(job_id)),
                }),
            )
        }
        Err(e) => {
            tracing::error!(kind = %job_type, error = %e, "job submission failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(JobCreated { uuid: None }),
            )
        }
    }
}

async fn handle_step(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StepRequest>,
) -> (StatusCode, Json<JobCreated>) {
    submit(&state, JobSpec::Step(req)).await
}

async fn handle_path(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PathRequest>,
) -> (StatusCode, Json<JobCreated>) {
    submit(&state, JobSpec::Path(req)).await
}

async fn handle_graph(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GraphRequest>,
) -> (StatusCode, Json<JobCreated>) {
    submit(&state, JobSpec::Graph(req)).await
}

/// `{state}` while running, `{state: "stopped", result}` once finished; 404 with an empty
/// state for ids unknown to this job type.
async fn job_status(
    state: &AppState,
    job_type: JobType,
    job_id: &str,
) -> (StatusCode, Json<JobStatus<Value>>) {
    let empty = || JobStatus {
        state: String::new(),
        result: None,
    };
    match state.scheduler.get_status(job_type, job_id).await {
        Ok(Some(job)) => (
            StatusCode::OK,
            Json(JobStatus {
                state: job.state,
                result: job.result,
            }),
        ),
        Ok(None) => (StatusCode::NOT_FOUND, Json(empty())),
        Err(e) => {
            tracing::error!(job_id = %job_id, kind = %job_type, error = %e, "status lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(empty()))
        }
    }
}

async fn handle_step_status(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
) -> (StatusCode, Json<JobStatus<Value>>) {
    job_status(&state, JobType::Step, &uuid).await
}

async fn handle_path_status(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
) -> (StatusCode, Json<JobStatus<Value>>) {
    job_status(&state, JobType::Path, &uuid).await
}

async fn handle_graph_status(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
) -> (StatusCode, Json<JobStatus<Value>>) {
    job_status(&state, JobType::Graph, &uuid).await
}

async fn handle_health() -> &'static str {
    "ok"
}

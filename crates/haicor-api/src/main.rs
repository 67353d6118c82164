//! HAICOR REST API server: story catalog and inference jobs.

use haicor_api::server::{self, AppState};
use haicor_api::store::{InMemoryStoryStore, JsonlStoryStore};
use haicor_scheduler::{InMemoryScheduler, LexicalReasoner, DEFAULT_RETENTION};
use haicor_types::StoryStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let stories: Arc<dyn StoryStore + Send + Sync> = match std::env::var("HAICOR_STORIES") {
        Ok(path) => {
            tracing::info!(path = %path, "loading stories from file");
            Arc::new(JsonlStoryStore::new(path))
        }
        Err(_) => Arc::new(InMemoryStoryStore::seeded()),
    };
    let retention = std::env::var("HAICOR_JOB_RETENTION_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETENTION);
    let scheduler = Arc::new(InMemoryScheduler::with_retention(
        Arc::new(LexicalReasoner::from_env()),
        retention,
    ));
    let app = server::router(Arc::new(AppState { stories, scheduler }));

    let addr: SocketAddr = std::env::var("HAICOR_LISTEN")
        .unwrap_or_else(|_| "0.0.0.0:3001".to_string())
        .parse()?;
    tracing::info!("HAICOR API listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}

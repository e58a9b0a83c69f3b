//! CourseLoom — course-assistant backend server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use courseloom_canvas::CanvasClient;
use courseloom_core::CourseLoomConfig;
use courseloom_rag::{GeminiClient, Unconfigured, VertexRetriever};
use courseloom_store::CourseStore;
use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("COURSELOOM_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = CourseLoomConfig::from_env(resolve_data_dir())?;
    let store = Arc::new(CourseStore::open(&config.data_paths.coursedb)?);

    // AI collaborators. Without a cloud project the server still starts:
    // reads work, builds and analytics fail fast with a Config error.
    let retriever = Arc::new(VertexRetriever::new(
        config.cloud_project.clone(),
        config.cloud_location.clone(),
    ));
    let (generator, embedder): (
        Arc<dyn courseloom_rag::TextGenerator>,
        Arc<dyn courseloom_rag::Embedder>,
    ) = match &config.cloud_project {
        Some(project) => {
            let client = Arc::new(GeminiClient::new(project, config.cloud_location.clone()));
            (client.clone(), client)
        }
        None => {
            warn!("CLOUD_PROJECT not set; AI collaborators disabled");
            (Arc::new(Unconfigured), Arc::new(Unconfigured))
        }
    };

    let canvas = config
        .lms_token
        .as_ref()
        .map(|token| Arc::new(CanvasClient::new(config.lms_base_url.clone(), token.clone())));
    if canvas.is_none() {
        warn!("CANVAS_API_TOKEN not set; course initialization disabled");
    }

    let port = config.port;
    let state = Arc::new(AppState::new(
        config,
        store,
        retriever.clone(),
        retriever,
        generator,
        embedder,
        canvas,
    ));

    let router = routes::build_router(state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("CourseLoom listening on {addr}");
    axum::serve(listener, router).await?;
    Ok(())
}

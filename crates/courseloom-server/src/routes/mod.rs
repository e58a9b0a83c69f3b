//! HTTP route handlers.

pub mod analytics;
pub mod chat;
pub mod courses;
pub mod graph;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use courseloom_core::{Error, Result};
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(courses::routes())
        .merge(chat::routes())
        .merge(graph::routes())
        .merge(analytics::routes())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Run a synchronous core operation off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("blocking task failed: {e}")))?
}

/// Map core errors onto HTTP statuses.
pub(crate) fn error_response(err: Error) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Collaborator(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

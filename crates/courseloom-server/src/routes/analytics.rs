//! Analytics routes: run the clustering pipeline, fetch the latest report.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use courseloom_analytics::{get_analytics_report, run_daily_analytics, ClusterCount};
use courseloom_core::Error;
use serde::Deserialize;

use super::{blocking, error_response};
use crate::state::AppState;

const DEFAULT_CLUSTERS: usize = 5;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analytics/run", post(run_analytics))
        .route("/analytics/{course_id}", get(get_report))
}

#[derive(Deserialize)]
struct RunAnalyticsRequest {
    course_id: String,
    #[serde(default)]
    n_clusters: Option<usize>,
    #[serde(default)]
    auto_detect: Option<bool>,
}

async fn run_analytics(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunAnalyticsRequest>,
) -> impl IntoResponse {
    let k = if req.auto_detect.unwrap_or(req.n_clusters.is_none()) {
        ClusterCount::Auto
    } else {
        ClusterCount::Fixed(req.n_clusters.unwrap_or(DEFAULT_CLUSTERS))
    };

    let store = state.store.clone();
    let generator = state.generator.clone();
    let result = blocking(move || {
        run_daily_analytics(
            &req.course_id,
            k,
            store.as_ref(),
            generator.as_ref(),
            store.as_ref(),
        )
    })
    .await;

    match result {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.clone();
    let result = blocking(move || {
        get_analytics_report(&course_id, store.as_ref())?
            .ok_or_else(|| Error::NotFound("no analytics report".into()))
    })
    .await;

    match result {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

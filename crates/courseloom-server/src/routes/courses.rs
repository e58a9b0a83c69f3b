//! Course lifecycle routes: launch resolution and initialization.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use courseloom_canvas::CanvasClient;
use courseloom_core::Error;
use courseloom_graph::{build_initial, extract_topics_from_summaries};
use courseloom_rag::{CorpusAdmin, Retriever, TextGenerator};
use courseloom_store::{CourseStatus, CourseStore};
use serde::Deserialize;
use tracing::{info, warn};

use super::{blocking, error_response};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/launch", get(launch))
        .route("/initialize-course", post(initialize_course))
}

#[derive(Deserialize)]
struct LaunchParams {
    course_id: String,
    #[serde(default)]
    role: Option<String>,
}

/// Resolve what the client should show for a course: the lifecycle state
/// plus, for active courses, a role-dependent view.
async fn launch(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LaunchParams>,
) -> impl IntoResponse {
    let store = state.store.clone();
    let course_id = params.course_id.clone();
    let status = match blocking(move || store.course_state(&course_id)).await {
        Ok(s) => s,
        Err(e) => return error_response(e).into_response(),
    };

    let view = match status {
        CourseStatus::Active => match params.role.as_deref() {
            Some("instructor") | Some("teacher") => "teacher_view",
            _ => "student_view",
        },
        CourseStatus::NeedsInit => "init_prompt",
        CourseStatus::Generating => "generating",
        CourseStatus::NotReady => "not_ready",
    };

    Json(serde_json::json!({ "state": status, "view": view })).into_response()
}

#[derive(Deserialize)]
struct InitializeRequest {
    course_id: String,
    /// Professor-declared topics. When absent, topics are extracted from
    /// the course syllabus.
    #[serde(default)]
    topics: Option<Vec<String>>,
}

/// Full course initialization: fetch the file catalog, provision the
/// retrieval corpus (best-effort per file), build the knowledge graph
/// (fail-fast per topic), and activate the course document. A failed run
/// flips the course back to `NotReady` so launch offers a retry instead
/// of showing `Generating` forever.
async fn initialize_course(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InitializeRequest>,
) -> impl IntoResponse {
    let Some(canvas) = state.canvas.clone() else {
        return error_response(Error::Config("LMS token not configured".into()))
            .into_response();
    };

    let lock = state.course_lock(&req.course_id);
    let _guard = lock.lock().await;

    let store = state.store.clone();
    let retriever = state.retriever.clone();
    let admin = state.corpus_admin.clone();
    let generator = state.generator.clone();

    let result = blocking(move || {
        store.create_course(&req.course_id)?;
        let course_id = req.course_id.clone();

        match run_initialization(&store, &canvas, &retriever, &admin, &generator, req) {
            Ok(body) => Ok(body),
            Err(e) => {
                if let Err(status_err) = store.mark_not_ready(&course_id) {
                    warn!("Could not reset course {course_id} after failed init: {status_err}");
                }
                Err(e)
            }
        }
    })
    .await;

    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

fn run_initialization(
    store: &CourseStore,
    canvas: &CanvasClient,
    retriever: &Arc<dyn Retriever>,
    admin: &Arc<dyn CorpusAdmin>,
    generator: &Arc<dyn TextGenerator>,
    req: InitializeRequest,
) -> courseloom_core::Result<serde_json::Value> {
    let files = canvas.get_course_files(&req.course_id)?;
    let outcome = courseloom_canvas::provision_corpus(admin.as_ref(), &files, |f| {
        canvas.download(f)
    })?;

    let topics = match req.topics {
        Some(topics) => topics,
        None => {
            let syllabus = canvas.get_syllabus(&req.course_id)?;
            if syllabus.trim().is_empty() {
                Vec::new()
            } else {
                extract_topics_from_summaries(&[syllabus], generator.as_ref())?
            }
        }
    };

    let file_refs: Vec<_> = files.iter().map(|f| f.to_file_ref()).collect();
    let graph = build_initial(&topics, &outcome.corpus_id, &file_refs, retriever.as_ref())?;

    store.finalize_course(&req.course_id, &outcome.corpus_id, &file_refs, &graph)?;
    info!(
        "Course {} initialized: {} topics, {} files ({} skipped)",
        req.course_id,
        topics.len(),
        outcome.uploaded,
        outcome.skipped
    );

    Ok(serde_json::json!({
        "status": "complete",
        "corpus_id": outcome.corpus_id,
        "num_topics": topics.len(),
        "files_indexed": outcome.uploaded,
        "files_skipped": outcome.skipped,
    }))
}

//! Knowledge graph routes: fetch, add topic, remove topic, node clicks.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use courseloom_core::{Error, Result};
use courseloom_graph::{add_topic, remove_topic, GraphSnapshot};
use courseloom_store::CourseStore;
use serde::Deserialize;

use super::{blocking, error_response};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/get-graph", get(get_graph))
        .route("/add-topic", post(add_topic_route))
        .route("/remove-topic", post(remove_topic_route))
        .route("/log-node-click", post(log_node_click))
}

fn course_graph(store: &CourseStore, course_id: &str) -> Result<(GraphSnapshot, Option<String>)> {
    let record = store
        .get_course(course_id)?
        .ok_or_else(|| Error::NotFound(format!("course {course_id}")))?;
    let graph = record
        .graph
        .ok_or_else(|| Error::NotFound(format!("course {course_id} has no graph")))?;
    Ok((graph, record.corpus_id))
}

#[derive(Deserialize)]
struct GraphParams {
    course_id: String,
}

async fn get_graph(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GraphParams>,
) -> impl IntoResponse {
    let store = state.store.clone();
    let result = blocking(move || {
        let record = store
            .get_course(&params.course_id)?
            .ok_or_else(|| Error::NotFound(format!("course {}", params.course_id)))?;
        let graph = record.graph.unwrap_or_default();
        Ok(serde_json::json!({
            "nodes": graph.nodes,
            "edges": graph.edges,
            "data": graph.data,
            "indexed_files": record.indexed_files,
        }))
    })
    .await;

    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Deserialize)]
struct AddTopicRequest {
    course_id: String,
    topic_name: String,
}

/// Add a topic under the course's mutation lock so concurrent mutations
/// cannot race their read-modify-write of the stored snapshot.
async fn add_topic_route(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddTopicRequest>,
) -> impl IntoResponse {
    let lock = state.course_lock(&req.course_id);
    let _guard = lock.lock().await;

    let store = state.store.clone();
    let retriever = state.retriever.clone();
    let result = blocking(move || {
        let (graph, corpus_id) = course_graph(&store, &req.course_id)?;
        let corpus_id = corpus_id
            .ok_or_else(|| Error::Config(format!("course {} has no corpus", req.course_id)))?;

        let updated = add_topic(&req.topic_name, &corpus_id, &graph, retriever.as_ref())?;
        store.update_graph(&req.course_id, &updated)?;
        Ok(snapshot_body(&updated))
    })
    .await;

    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Deserialize)]
struct RemoveTopicRequest {
    course_id: String,
    topic_id: String,
}

async fn remove_topic_route(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RemoveTopicRequest>,
) -> impl IntoResponse {
    let lock = state.course_lock(&req.course_id);
    let _guard = lock.lock().await;

    let store = state.store.clone();
    let result = blocking(move || {
        let (graph, _) = course_graph(&store, &req.course_id)?;
        // Unknown topic ids are a no-op; the write is harmless either way.
        let updated = remove_topic(&req.topic_id, &graph);
        store.update_graph(&req.course_id, &updated)?;
        Ok(snapshot_body(&updated))
    })
    .await;

    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

fn snapshot_body(graph: &GraphSnapshot) -> serde_json::Value {
    serde_json::json!({
        "status": "success",
        "nodes": graph.nodes,
        "edges": graph.edges,
        "data": graph.data,
    })
}

#[derive(Deserialize)]
struct NodeClickRequest {
    course_id: String,
    node_id: String,
    node_label: String,
    #[serde(default)]
    node_type: Option<String>,
}

async fn log_node_click(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NodeClickRequest>,
) -> impl IntoResponse {
    let store = state.store.clone();
    let result = blocking(move || {
        store.log_node_click(
            &req.course_id,
            &req.node_id,
            &req.node_label,
            req.node_type.as_deref(),
        )
    })
    .await;

    match result {
        Ok(doc_id) => {
            Json(serde_json::json!({ "status": "success", "doc_id": doc_id })).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

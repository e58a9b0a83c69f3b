//! Chat routes: RAG answers, suggested questions, answer rating.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use courseloom_core::{Error, Result};
use courseloom_rag::ChatMessage;
use courseloom_store::{CourseRecord, CourseStatus, CourseStore};
use serde::Deserialize;
use tracing::warn;

use super::{blocking, error_response};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", post(chat))
        .route("/suggested-questions", post(suggested_questions))
        .route("/rate-answer", post(rate_answer))
}

#[derive(Deserialize)]
struct ChatRequest {
    course_id: String,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    history: Option<Vec<ChatMessage>>,
}

fn active_course(store: &CourseStore, course_id: &str) -> Result<(CourseRecord, String)> {
    let record = store
        .get_course(course_id)?
        .ok_or_else(|| Error::NotFound(format!("course {course_id}")))?;
    if record.status != CourseStatus::Active {
        return Err(Error::Config(format!(
            "course {course_id} is not active ({})",
            record.status.as_str()
        )));
    }
    let corpus_id = record
        .corpus_id
        .clone()
        .ok_or_else(|| Error::Config(format!("course {course_id} has no corpus")))?;
    Ok((record, corpus_id))
}

/// Answer a student question against the course corpus and log the query
/// for analytics. An embedding failure downgrades the logged event to
/// vectorless; it never fails the chat.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    let store = state.store.clone();
    let retriever = state.retriever.clone();
    let embedder = state.embedder.clone();

    let result = blocking(move || {
        let (_, corpus_id) = active_course(&store, &req.course_id)?;

        let (answer, query_text) = match (&req.history, &req.query) {
            (Some(history), _) if !history.is_empty() => {
                let last_user = history
                    .iter()
                    .rev()
                    .find(|m| m.role == "user")
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                (retriever.query_with_history(&corpus_id, history)?, last_user)
            }
            (_, Some(query)) => (retriever.query(&corpus_id, query)?, query.clone()),
            _ => return Err(Error::Internal("missing query or history".into())),
        };

        let vector = match embedder.embed(&query_text) {
            Ok(v) if v.len() == embedder.dimension() => Some(v),
            Ok(v) => {
                warn!(
                    "Embedding has {} values, model dimension is {}; logging without vector",
                    v.len(),
                    embedder.dimension()
                );
                None
            }
            Err(e) => {
                warn!("Query embedding failed, logging without vector: {e}");
                None
            }
        };
        let sources: Vec<String> =
            answer.sources.iter().map(|s| s.filename.clone()).collect();
        let log_doc_id = store.log_chat_query(
            &req.course_id,
            &query_text,
            &answer.summary,
            &sources,
            vector.as_deref(),
        )?;

        Ok(serde_json::json!({
            "answer": answer.summary,
            "sources": sources,
            "log_doc_id": log_doc_id,
        }))
    })
    .await;

    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Deserialize)]
struct SuggestedQuestionsRequest {
    topic: String,
}

async fn suggested_questions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SuggestedQuestionsRequest>,
) -> impl IntoResponse {
    let generator = state.generator.clone();
    let result = blocking(move || {
        courseloom_rag::suggested_questions(generator.as_ref(), &req.topic)
    })
    .await;

    match result {
        Ok(questions) => Json(serde_json::json!({ "questions": questions })).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Deserialize)]
struct RateAnswerRequest {
    log_doc_id: String,
    rating: String,
}

async fn rate_answer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RateAnswerRequest>,
) -> impl IntoResponse {
    let store = state.store.clone();
    let result = blocking(move || store.rate_answer(&req.log_doc_id, &req.rating)).await;

    match result {
        Ok(()) => Json(serde_json::json!({ "status": "success" })).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

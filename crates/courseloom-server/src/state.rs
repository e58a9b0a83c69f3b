//! Shared application state.

use std::sync::Arc;

use courseloom_canvas::CanvasClient;
use courseloom_core::CourseLoomConfig;
use courseloom_rag::{CorpusAdmin, Embedder, Retriever, TextGenerator};
use courseloom_store::CourseStore;
use dashmap::DashMap;
use tokio::sync::Mutex;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: CourseLoomConfig,
    pub store: Arc<CourseStore>,
    pub retriever: Arc<dyn Retriever>,
    pub corpus_admin: Arc<dyn CorpusAdmin>,
    pub generator: Arc<dyn TextGenerator>,
    pub embedder: Arc<dyn Embedder>,
    /// Set when an LMS token is configured; course initialization needs it.
    pub canvas: Option<Arc<CanvasClient>>,
    /// Per-course mutation locks. Graph snapshots are read-modify-write,
    /// so concurrent add/remove on the same course must serialize here.
    course_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AppState {
    pub fn new(
        config: CourseLoomConfig,
        store: Arc<CourseStore>,
        retriever: Arc<dyn Retriever>,
        corpus_admin: Arc<dyn CorpusAdmin>,
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn Embedder>,
        canvas: Option<Arc<CanvasClient>>,
    ) -> Self {
        Self {
            config,
            store,
            retriever,
            corpus_admin,
            generator,
            embedder,
            canvas,
            course_locks: DashMap::new(),
        }
    }

    /// The mutation lock for one course.
    pub fn course_lock(&self, course_id: &str) -> Arc<Mutex<()>> {
        self.course_locks
            .entry(course_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

//! Collaborator traits consumed by the graph builder and analytics core.

use courseloom_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A source file that grounded a retrieval answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedSource {
    pub filename: String,
}

/// A generated answer grounded in retrieved course material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalAnswer {
    pub summary: String,
    pub sources: Vec<RetrievedSource>,
}

/// One turn of a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
}

/// Retrieval backend: query a corpus, get a grounded answer plus citations.
pub trait Retriever: Send + Sync {
    /// Whether the backend is usable. Callers fail fast with a `Config`
    /// error before issuing any queries when this is false.
    fn is_configured(&self) -> bool;

    /// Query the corpus with a single text and generate a grounded answer.
    fn query(&self, corpus_id: &str, text: &str) -> Result<RetrievalAnswer>;

    /// Query with conversation history. Retrieval is driven by the last
    /// user message; implementations may fold earlier turns into the
    /// generation prompt.
    fn query_with_history(
        &self,
        corpus_id: &str,
        history: &[ChatMessage],
    ) -> Result<RetrievalAnswer> {
        let last_user = history
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .ok_or_else(|| Error::Collaborator("no user message in history".into()))?;
        self.query(corpus_id, &last_user.content)
    }
}

/// Single-shot text completion. No session state is retained.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Text embedding backend for query analytics.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimension(&self) -> usize;
}

/// Corpus administration: create a corpus and import files into it.
/// Provisioning policy (best-effort per file) lives with the caller.
pub trait CorpusAdmin: Send + Sync {
    fn create_corpus(&self, display_name: &str) -> Result<String>;

    fn import_file(
        &self,
        corpus_id: &str,
        file_id: &str,
        display_name: &str,
        content: &[u8],
    ) -> Result<()>;
}

/// Placeholder backend used when no cloud project is configured.
/// Every call fails with a `Config` error so builds fail fast.
pub struct Unconfigured;

impl Retriever for Unconfigured {
    fn is_configured(&self) -> bool {
        false
    }

    fn query(&self, _corpus_id: &str, _text: &str) -> Result<RetrievalAnswer> {
        Err(Error::Config("retrieval backend not configured".into()))
    }
}

impl TextGenerator for Unconfigured {
    fn generate(&self, _prompt: &str) -> Result<String> {
        Err(Error::Config("generation backend not configured".into()))
    }
}

impl Embedder for Unconfigured {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::Config("embedding backend not configured".into()))
    }

    fn dimension(&self) -> usize {
        0
    }
}

//! Blocking HTTP client for a Vertex-style RAG corpus.
//!
//! `query` retrieves the top matching chunks, collects the unique source
//! files that grounded them, and asks the generation model for an answer
//! constrained to that context.

use base64::Engine;
use courseloom_core::{Error, Result};
use reqwest::blocking::Client;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::gemini::GeminiClient;
use crate::traits::{
    ChatMessage, CorpusAdmin, RetrievalAnswer, RetrievedSource, Retriever, TextGenerator,
};

const SIMILARITY_TOP_K: usize = 10;

/// Retrieval backend over a hosted RAG corpus plus a generation client.
pub struct VertexRetriever {
    http: Client,
    project: Option<String>,
    location: String,
    api_token: Option<String>,
    generator: Option<GeminiClient>,
}

/// One retrieved context chunk.
struct Context {
    text: String,
    source: Option<String>,
}

impl VertexRetriever {
    /// Build from an optional cloud project. `None` produces an
    /// unconfigured retriever whose queries fail fast.
    pub fn new(project: Option<String>, location: impl Into<String>) -> Self {
        let location = location.into();
        let generator = project
            .as_deref()
            .map(|p| GeminiClient::new(p, location.clone()));
        Self {
            http: Client::new(),
            project,
            location,
            api_token: std::env::var("CLOUD_API_TOKEN").ok(),
            generator,
        }
    }

    fn endpoint(&self, verb: &str) -> Result<String> {
        let project = self
            .project
            .as_deref()
            .ok_or_else(|| Error::Config("cloud project not set".into()))?;
        Ok(format!(
            "https://{loc}-aiplatform.googleapis.com/v1beta1/projects/{project}/locations/{loc}{verb}",
            loc = self.location,
        ))
    }

    fn post(&self, url: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let mut req = self.http.post(url).json(&body);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }
        let response = req
            .send()
            .map_err(|e| Error::Collaborator(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(Error::Collaborator(format!("API error {status}: {text}")));
        }
        response
            .json()
            .map_err(|e| Error::Collaborator(format!("invalid response body: {e}")))
    }

    /// Retrieve the top matching chunks for a query text.
    fn retrieve_contexts(&self, corpus_id: &str, text: &str) -> Result<Vec<Context>> {
        let url = self.endpoint(":retrieveContexts")?;
        let body = json!({
            "vertex_rag_store": { "rag_resources": [{ "rag_corpus": corpus_id }] },
            "query": { "text": text, "similarity_top_k": SIMILARITY_TOP_K },
        });
        let value = self.post(&url, body)?;

        let contexts = value["contexts"]["contexts"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        Ok(contexts
            .iter()
            .map(|c| Context {
                text: c["text"].as_str().unwrap_or_default().to_string(),
                source: c["source_display_name"].as_str().map(str::to_string),
            })
            .collect())
    }

    fn generator(&self) -> Result<&GeminiClient> {
        self.generator
            .as_ref()
            .ok_or_else(|| Error::Config("cloud project not set".into()))
    }

    fn answer(&self, contexts: &[Context], prompt: &str) -> Result<RetrievalAnswer> {
        // Unique citations, first occurrence wins.
        let mut sources: Vec<RetrievedSource> = Vec::new();
        for ctx in contexts {
            if let Some(name) = &ctx.source {
                if !sources.iter().any(|s| &s.filename == name) {
                    sources.push(RetrievedSource {
                        filename: name.clone(),
                    });
                }
            }
        }
        debug!(
            "Retrieved {} context chunks from {} sources",
            contexts.len(),
            sources.len()
        );

        let summary = self.generator()?.generate(prompt)?;
        Ok(RetrievalAnswer { summary, sources })
    }

    fn context_block(contexts: &[Context]) -> String {
        contexts
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Retriever for VertexRetriever {
    fn is_configured(&self) -> bool {
        self.project.is_some()
    }

    fn query(&self, corpus_id: &str, text: &str) -> Result<RetrievalAnswer> {
        info!("Querying corpus {}: {:.60}", corpus_id, text);
        let contexts = self.retrieve_contexts(corpus_id, text)?;
        let prompt = format!(
            "You are a teaching assistant for a course. Answer using ONLY the \
             provided course materials. Be clear, concise, and educational. If \
             the context is insufficient, say so.\n\nCourse materials:\n{}\n\n\
             Question: {}\n\nAnswer:",
            Self::context_block(&contexts),
            text,
        );
        self.answer(&contexts, &prompt)
    }

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

        let contexts = self.retrieve_contexts(corpus_id, &last_user.content)?;

        let mut transcript = String::new();
        for msg in &history[..history.len().saturating_sub(1)] {
            let speaker = if msg.role == "user" { "Student" } else { "Assistant" };
            transcript.push_str(&format!("{}: {}\n\n", speaker, msg.content));
        }

        let prompt = format!(
            "You are a teaching assistant for a course. Answer the student's \
             question using the course materials and the conversation so far. \
             Maintain conversational flow.\n\nCourse materials:\n{}\n\n\
             Previous conversation:\n{}\nCurrent question: {}\n\nAnswer:",
            Self::context_block(&contexts),
            transcript,
            last_user.content,
        );
        self.answer(&contexts, &prompt)
    }
}

impl CorpusAdmin for VertexRetriever {
    fn create_corpus(&self, display_name: &str) -> Result<String> {
        let url = self.endpoint("/ragCorpora")?;
        let value = self.post(&url, json!({ "display_name": display_name }))?;
        let name = value["name"]
            .as_str()
            .ok_or_else(|| Error::Collaborator("corpus response missing name".into()))?;
        info!("Created corpus: {}", name);
        Ok(name.to_string())
    }

    fn import_file(
        &self,
        corpus_id: &str,
        file_id: &str,
        display_name: &str,
        content: &[u8],
    ) -> Result<()> {
        let url = self.endpoint(&format!("/{corpus_id}/ragFiles:upload"))?;
        let body = json!({
            "rag_file": {
                "display_name": display_name,
                "metadata": { "file_id": file_id },
            },
            "content": base64::engine::general_purpose::STANDARD.encode(content),
        });
        if let Err(e) = self.post(&url, body) {
            warn!("Upload failed for {}: {}", display_name, e);
            return Err(e);
        }
        Ok(())
    }
}

//! Blocking HTTP client for Gemini-style generation and embedding endpoints.

use courseloom_core::{Error, Result};
use reqwest::blocking::Client;
use serde_json::json;
use tracing::debug;

use crate::traits::{Embedder, TextGenerator};

const GENERATION_MODEL: &str = "gemini-1.5-flash";
const EMBEDDING_MODEL: &str = "text-embedding-004";
const EMBEDDING_DIM: usize = 768;

/// Client for the generation and embedding publisher models.
pub struct GeminiClient {
    http: Client,
    project: String,
    location: String,
    api_token: Option<String>,
}

impl GeminiClient {
    pub fn new(project: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            project: project.into(),
            location: location.into(),
            api_token: std::env::var("CLOUD_API_TOKEN").ok(),
        }
    }

    fn model_url(&self, model: &str, verb: &str) -> String {
        format!(
            "https://{loc}-aiplatform.googleapis.com/v1/projects/{proj}/locations/{loc}/publishers/google/models/{model}:{verb}",
            loc = self.location,
            proj = self.project,
        )
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
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Generating with {} ({} chars)", GENERATION_MODEL, prompt.len());
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        let value = self.post(&self.model_url(GENERATION_MODEL, "generateContent"), body)?;

        let text = value["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Collaborator("empty generation response".into()));
        }
        Ok(text)
    }
}

impl Embedder for GeminiClient {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "instances": [{ "content": text, "task_type": "RETRIEVAL_QUERY" }],
        });
        let value = self.post(&self.model_url(EMBEDDING_MODEL, "predict"), body)?;

        let values = value["predictions"][0]["embeddings"]["values"]
            .as_array()
            .ok_or_else(|| Error::Collaborator("missing embedding values".into()))?;
        Ok(values
            .iter()
            .filter_map(|v| v.as_f64())
            .map(|v| v as f32)
            .collect())
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

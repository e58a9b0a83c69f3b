//! Blocking HTTP client for the Canvas REST API.

use courseloom_core::{Error, Result};
use reqwest::blocking::Client;
use tracing::info;

use crate::types::CanvasFile;

const PER_PAGE: usize = 100;

pub struct CanvasClient {
    http: Client,
    base_url: String,
    token: String,
}

impl CanvasClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    fn get(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| Error::Http(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http(format!("Canvas API error {status} for {path}")));
        }
        response
            .json()
            .map_err(|e| Error::Http(format!("invalid response body: {e}")))
    }

    /// Fetch the course file catalog, preserving the API's order.
    pub fn get_course_files(&self, course_id: &str) -> Result<Vec<CanvasFile>> {
        let value = self.get(&format!("/courses/{course_id}/files?per_page={PER_PAGE}"))?;
        let files: Vec<CanvasFile> = serde_json::from_value(value)?;
        info!("Fetched {} files for course {}", files.len(), course_id);
        Ok(files)
    }

    /// Fetch the syllabus body text; empty string when none is set.
    pub fn get_syllabus(&self, course_id: &str) -> Result<String> {
        let value = self.get(&format!("/courses/{course_id}?include[]=syllabus_body"))?;
        Ok(value["syllabus_body"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    /// Download one file's content via its authenticated URL.
    pub fn download(&self, file: &CanvasFile) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(&file.url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| Error::Http(format!("download failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http(format!(
                "download error {status} for {}",
                file.display_name
            )));
        }
        let bytes = response
            .bytes()
            .map_err(|e| Error::Http(format!("download read failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

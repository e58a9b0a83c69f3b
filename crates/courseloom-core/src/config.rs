//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths to all CourseLoom data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Course database directory (`data/coursedb/`).
    pub coursedb: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            coursedb: root.join("coursedb"),
            root,
        };
        std::fs::create_dir_all(&paths.coursedb)?;
        Ok(paths)
    }
}

/// Top-level CourseLoom configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseLoomConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// LMS API base URL (e.g., `https://canvas.instructure.com/api/v1`).
    pub lms_base_url: String,
    /// LMS API access token.
    pub lms_token: Option<String>,
    /// Cloud project backing the retrieval and generation collaborators.
    /// `None` means the AI collaborators are unconfigured and graph builds
    /// must fail fast.
    pub cloud_project: Option<String>,
    /// Cloud region for the collaborators.
    pub cloud_location: String,
}

impl CourseLoomConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3004);

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            lms_base_url: std::env::var("CANVAS_API_BASE")
                .unwrap_or_else(|_| "https://canvas.instructure.com/api/v1".to_string()),
            lms_token: std::env::var("CANVAS_API_TOKEN").ok(),
            cloud_project: std::env::var("CLOUD_PROJECT").ok(),
            cloud_location: std::env::var("CLOUD_LOCATION")
                .unwrap_or_else(|_| "us-central1".to_string()),
        })
    }
}

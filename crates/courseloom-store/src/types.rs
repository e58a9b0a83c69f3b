//! Store value types.

use courseloom_core::{Error, Result};
use courseloom_graph::{FileRef, GraphSnapshot};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a course. Serialized to the legacy wire strings
/// (`NEEDS_INIT`, …) only at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseStatus {
    /// No course document exists yet; an instructor must initialize it.
    NeedsInit,
    /// A document exists but holds no usable corpus/graph.
    NotReady,
    /// Initialization is in progress.
    Generating,
    /// Corpus and graph are ready to serve.
    Active,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::NeedsInit => "NEEDS_INIT",
            CourseStatus::NotReady => "NOT_READY",
            CourseStatus::Generating => "GENERATING",
            CourseStatus::Active => "ACTIVE",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "NEEDS_INIT" => Ok(CourseStatus::NeedsInit),
            "NOT_READY" => Ok(CourseStatus::NotReady),
            "GENERATING" => Ok(CourseStatus::Generating),
            "ACTIVE" => Ok(CourseStatus::Active),
            other => Err(Error::Database(format!("unknown course status: {other}"))),
        }
    }
}

/// A full course document.
#[derive(Debug, Clone)]
pub struct CourseRecord {
    pub course_id: String,
    pub status: CourseStatus,
    pub corpus_id: Option<String>,
    pub indexed_files: Vec<FileRef>,
    pub graph: Option<GraphSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            CourseStatus::NeedsInit,
            CourseStatus::NotReady,
            CourseStatus::Generating,
            CourseStatus::Active,
        ] {
            assert_eq!(CourseStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(CourseStatus::parse("BOGUS").is_err());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&CourseStatus::NeedsInit).unwrap();
        assert_eq!(json, "\"NEEDS_INIT\"");
    }
}

//! Analytics data model and persistence collaborator traits.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use courseloom_core::Result;
use serde::{Deserialize, Serialize};

/// A logged student query, as produced by the chat logging path.
/// `query_vector` is `None` when embedding failed at log time; such
/// events are excluded from clustering and counted separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryEvent {
    pub doc_id: String,
    pub query_text: String,
    pub query_vector: Option<Vec<f32>>,
    pub timestamp: DateTime<Utc>,
}

/// Outcome marker for a persisted report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Complete,
    NoData,
}

/// Per-cluster entry in the report, keyed by its generated label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub count: usize,
    pub example_queries: Vec<String>,
    pub doc_ids: Vec<String>,
}

/// The persisted analytics report for one course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub status: ReportStatus,
    /// Queries that carried a vector and were clustered.
    pub total_queries: usize,
    /// Events dropped for lacking an embedding vector.
    pub skipped_no_vector: usize,
    pub num_clusters: usize,
    pub clusters: BTreeMap<String, ClusterSummary>,
    pub generated_at: DateTime<Utc>,
}

impl AnalyticsReport {
    pub fn no_data(skipped_no_vector: usize) -> Self {
        Self {
            status: ReportStatus::NoData,
            total_queries: 0,
            skipped_no_vector,
            num_clusters: 0,
            clusters: BTreeMap::new(),
            generated_at: Utc::now(),
        }
    }
}

/// Source of logged query events for a course.
pub trait EventSource: Send + Sync {
    fn get_events(&self, course_id: &str) -> Result<Vec<QueryEvent>>;
}

/// Persistence for analytics reports. Only the labeled report is stored;
/// raw cluster assignments are recomputed on every run.
pub trait ReportStore: Send + Sync {
    fn save_report(&self, course_id: &str, report: &AnalyticsReport) -> Result<()>;

    fn get_report(&self, course_id: &str) -> Result<Option<AnalyticsReport>>;
}

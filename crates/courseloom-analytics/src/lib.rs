//! Query analytics — clusters logged student questions into a labeled report.
//!
//! Pipeline: fetch events → extract vectors → k-means (fixed or
//! silhouette-selected k) → label each cluster with the generation
//! collaborator → persist the assembled report. Runs are atomic: any
//! collaborator failure aborts before persistence.

pub mod cluster;
pub mod report;
pub mod types;
pub mod vectors;

pub use cluster::{cluster_vectors, ClusterCount, Clustering};
pub use report::{get_analytics_report, run_daily_analytics};
pub use types::*;
pub use vectors::extract_vectors;

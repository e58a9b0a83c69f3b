//! Course persistence — SQLite-backed store for course documents, graph
//! snapshots, the query-event log, and analytics reports.
//!
//! Implements the `EventSource` and `ReportStore` collaborator contracts
//! consumed by the analytics core.

pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::CourseStore;
pub use types::{CourseRecord, CourseStatus};

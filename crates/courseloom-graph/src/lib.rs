//! Knowledge graph core — snapshot data model and builder operations.
//!
//! A course's graph is a snapshot triple (nodes, edges, per-topic data).
//! Snapshots are immutable values: every builder operation takes the
//! current snapshot and returns a new one, so a failed operation leaves
//! the caller's snapshot authoritative and retries are safe.

pub mod builder;
pub mod types;

pub use builder::{add_topic, build_initial, extract_topics_from_summaries, remove_topic};
pub use types::{FileRef, GraphEdge, GraphNode, GraphSnapshot, NodeGroup, TopicData};

//! Canvas LMS client — course file catalog, syllabus, and corpus
//! provisioning. Thin I/O glue around the LMS REST API; the graph and
//! analytics cores never talk to it directly.

pub mod client;
pub mod provision;
pub mod types;

pub use client::CanvasClient;
pub use provision::{provision_corpus, ProvisionOutcome};
pub use types::CanvasFile;

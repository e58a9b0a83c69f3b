//! RAG collaborators — retrieval, generation, and embedding backends.
//!
//! The traits abstract over the external AI services; the graph builder and
//! analytics pipeline consume them without knowing the wire protocol.
//! Implementations:
//! - `VertexRetriever` / `GeminiClient`: HTTP clients for a Vertex-style
//!   retrieval corpus and Gemini-style generation/embedding endpoints.
//! - `Unconfigured`: returns `Config` errors to signal fail-fast paths.

pub mod gemini;
pub mod questions;
pub mod retrieval;
pub mod traits;

pub use gemini::GeminiClient;
pub use questions::suggested_questions;
pub use retrieval::VertexRetriever;
pub use traits::*;

//! Canvas API payload types.

use courseloom_graph::FileRef;
use serde::{Deserialize, Serialize};

/// A file entry from `GET /courses/:id/files`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasFile {
    pub id: i64,
    pub display_name: String,
    /// Authenticated download URL.
    pub url: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl CanvasFile {
    /// The catalog entry the graph builder consumes: the numeric id becomes
    /// the file node id, verbatim.
    pub fn to_file_ref(&self) -> FileRef {
        FileRef::new(self.id.to_string(), self.display_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_ref_uses_stringified_id() {
        let file = CanvasFile {
            id: 101,
            display_name: "Chapter 3.pdf".into(),
            url: "https://canvas.example/files/101/download".into(),
            html_url: None,
        };
        let file_ref = file.to_file_ref();
        assert_eq!(file_ref.id, "101");
        assert_eq!(file_ref.display_name, "Chapter 3.pdf");
    }
}

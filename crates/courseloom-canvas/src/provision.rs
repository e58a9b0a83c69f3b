//! Corpus provisioning: create a retrieval corpus and import course files.
//!
//! Deliberately best-effort per file: a single file that fails to
//! download or import is logged and skipped so the rest of the course
//! still gets indexed. (The graph builder is the opposite — it fails the
//! whole build on the first topic error.)

use courseloom_core::Result;
use courseloom_rag::CorpusAdmin;
use tracing::{info, warn};

use crate::types::CanvasFile;

/// What a provisioning run produced.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub corpus_id: String,
    pub uploaded: usize,
    pub skipped: usize,
}

/// Create a corpus and import every course file into it. Corpus creation
/// failure aborts; per-file failures are skipped and counted.
pub fn provision_corpus(
    admin: &dyn CorpusAdmin,
    files: &[CanvasFile],
    download: impl Fn(&CanvasFile) -> Result<Vec<u8>>,
) -> Result<ProvisionOutcome> {
    let corpus_id =
        admin.create_corpus(&format!("Course Corpus - {} files", files.len()))?;

    let mut uploaded = 0;
    let mut skipped = 0;
    for file in files {
        let content = match download(file) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping {} (download failed: {})", file.display_name, e);
                skipped += 1;
                continue;
            }
        };
        match admin.import_file(&corpus_id, &file.id.to_string(), &file.display_name, &content) {
            Ok(()) => uploaded += 1,
            Err(e) => {
                warn!("Skipping {} (import failed: {})", file.display_name, e);
                skipped += 1;
            }
        }
    }

    info!(
        "Corpus {} provisioned: {} uploaded, {} skipped",
        corpus_id, uploaded, skipped
    );
    Ok(ProvisionOutcome {
        corpus_id,
        uploaded,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseloom_core::Error;
    use std::sync::Mutex;

    struct RecordingAdmin {
        create_fails: bool,
        fail_import_for: Option<String>,
        imported: Mutex<Vec<String>>,
    }

    impl RecordingAdmin {
        fn new() -> Self {
            Self {
                create_fails: false,
                fail_import_for: None,
                imported: Mutex::new(Vec::new()),
            }
        }
    }

    impl CorpusAdmin for RecordingAdmin {
        fn create_corpus(&self, _display_name: &str) -> Result<String> {
            if self.create_fails {
                return Err(Error::Collaborator("corpus API down".into()));
            }
            Ok("corpora/123".into())
        }

        fn import_file(
            &self,
            _corpus_id: &str,
            _file_id: &str,
            display_name: &str,
            _content: &[u8],
        ) -> Result<()> {
            if self.fail_import_for.as_deref() == Some(display_name) {
                return Err(Error::Collaborator("import rejected".into()));
            }
            self.imported.lock().unwrap().push(display_name.to_string());
            Ok(())
        }
    }

    fn file(id: i64, name: &str) -> CanvasFile {
        CanvasFile {
            id,
            display_name: name.into(),
            url: format!("https://canvas.example/files/{id}/download"),
            html_url: None,
        }
    }

    #[test]
    fn test_provision_continues_past_failed_files() {
        let mut admin = RecordingAdmin::new();
        admin.fail_import_for = Some("Lecture 5.pdf".into());
        let files = vec![file(101, "Chapter 3.pdf"), file(102, "Lecture 5.pdf")];

        let outcome = provision_corpus(&admin, &files, |f| {
            if f.id == 101 {
                Ok(b"pdf bytes".to_vec())
            } else {
                Ok(b"other bytes".to_vec())
            }
        })
        .unwrap();

        assert_eq!(outcome.corpus_id, "corpora/123");
        assert_eq!(outcome.uploaded, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(*admin.imported.lock().unwrap(), vec!["Chapter 3.pdf"]);
    }

    #[test]
    fn test_download_failure_is_skipped() {
        let admin = RecordingAdmin::new();
        let files = vec![file(101, "Chapter 3.pdf")];
        let outcome =
            provision_corpus(&admin, &files, |_| Err(Error::Http("404".into()))).unwrap();
        assert_eq!(outcome.uploaded, 0);
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn test_corpus_creation_failure_aborts() {
        let mut admin = RecordingAdmin::new();
        admin.create_fails = true;
        let err = provision_corpus(&admin, &[], |_| Ok(Vec::new())).unwrap_err();
        assert!(matches!(err, Error::Collaborator(_)));
    }
}

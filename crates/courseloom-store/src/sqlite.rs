//! SQLite-backed course store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use courseloom_analytics::{AnalyticsReport, EventSource, QueryEvent, ReportStore};
use courseloom_core::{Error, Result};
use courseloom_graph::{FileRef, GraphSnapshot};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use crate::schema::SCHEMA_SQL;
use crate::types::{CourseRecord, CourseStatus};

/// SQLite store for course documents, events, and reports.
pub struct CourseStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl CourseStore {
    /// Open or create the store. `db_dir` is the directory (e.g.,
    /// `data/coursedb/`); the file will be `db_dir/courseloom.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("courseloom.db");

        let conn = Connection::open(&db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(e.to_string()))?;

        info!("CourseStore initialized: path={}", db_path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // -----------------------------------------------------------
    // Course documents
    // -----------------------------------------------------------

    /// Current lifecycle state; `NeedsInit` when no document exists.
    pub fn course_state(&self, course_id: &str) -> Result<CourseStatus> {
        let conn = self.conn.lock();
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM courses WHERE course_id = ?1",
                params![course_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        match status {
            None => Ok(CourseStatus::NeedsInit),
            Some(raw) => CourseStatus::parse(&raw),
        }
    }

    /// Create the initial course document in `Generating` state.
    pub fn create_course(&self, course_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO courses (course_id, status, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(course_id) DO UPDATE SET status = ?2, updated_at = ?3",
            params![course_id, CourseStatus::Generating.as_str(), Utc::now().timestamp()],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    pub fn get_course(&self, course_id: &str) -> Result<Option<CourseRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT status, corpus_id, indexed_files, kg_nodes, kg_edges, kg_data
                 FROM courses WHERE course_id = ?1",
                params![course_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        let Some((status, corpus_id, indexed_files, nodes, edges, data)) = row else {
            return Ok(None);
        };

        let indexed_files: Vec<FileRef> = match indexed_files {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };
        let graph = match (nodes, edges, data) {
            (Some(n), Some(e), Some(d)) => Some(GraphSnapshot::from_json_parts(&n, &e, &d)?),
            _ => None,
        };

        Ok(Some(CourseRecord {
            course_id: course_id.to_string(),
            status: CourseStatus::parse(&status)?,
            corpus_id,
            indexed_files,
            graph,
        }))
    }

    /// Write the corpus id, file catalog, and graph, and flip the course
    /// to `Active`. One statement, so the snapshot triple lands together.
    pub fn finalize_course(
        &self,
        course_id: &str,
        corpus_id: &str,
        indexed_files: &[FileRef],
        graph: &GraphSnapshot,
    ) -> Result<()> {
        let (nodes, edges, data) = graph.to_json_parts()?;
        let files_json = serde_json::to_string(indexed_files)?;

        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE courses SET status = ?2, corpus_id = ?3, indexed_files = ?4,
                 kg_nodes = ?5, kg_edges = ?6, kg_data = ?7, updated_at = ?8
                 WHERE course_id = ?1",
                params![
                    course_id,
                    CourseStatus::Active.as_str(),
                    corpus_id,
                    files_json,
                    nodes,
                    edges,
                    data,
                    Utc::now().timestamp(),
                ],
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        if updated == 0 {
            return Err(Error::NotFound(format!("course {course_id}")));
        }
        info!("Course {course_id} finalized as ACTIVE");
        Ok(())
    }

    /// Flip a course to `NotReady`, used when an initialization run fails
    /// partway so the course does not stay stuck in `Generating`.
    pub fn mark_not_ready(&self, course_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE courses SET status = ?2, updated_at = ?3 WHERE course_id = ?1",
                params![
                    course_id,
                    CourseStatus::NotReady.as_str(),
                    Utc::now().timestamp(),
                ],
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        if updated == 0 {
            return Err(Error::NotFound(format!("course {course_id}")));
        }
        Ok(())
    }

    /// Replace the stored graph snapshot (add/remove topic paths).
    pub fn update_graph(&self, course_id: &str, graph: &GraphSnapshot) -> Result<()> {
        let (nodes, edges, data) = graph.to_json_parts()?;
        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE courses SET kg_nodes = ?2, kg_edges = ?3, kg_data = ?4, updated_at = ?5
                 WHERE course_id = ?1",
                params![course_id, nodes, edges, data, Utc::now().timestamp()],
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        if updated == 0 {
            return Err(Error::NotFound(format!("course {course_id}")));
        }
        Ok(())
    }

    // -----------------------------------------------------------
    // Event log
    // -----------------------------------------------------------

    /// Log one chat query. `vector` is `None` when embedding failed; the
    /// event still counts for the log but is excluded from clustering.
    pub fn log_chat_query(
        &self,
        course_id: &str,
        query_text: &str,
        answer_text: &str,
        sources: &[String],
        vector: Option<&[f32]>,
    ) -> Result<String> {
        let doc_id = Uuid::new_v4().to_string();
        let vector_json = vector.map(serde_json::to_string).transpose()?;
        let sources_json = serde_json::to_string(sources)?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO analytics_events
             (doc_id, course_id, event_type, query_text, answer_text, sources, query_vector, created_at)
             VALUES (?1, ?2, 'chat', ?3, ?4, ?5, ?6, ?7)",
            params![
                doc_id,
                course_id,
                query_text,
                answer_text,
                sources_json,
                vector_json,
                Utc::now().timestamp(),
            ],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        debug!("Logged chat query {doc_id} for {course_id}");
        Ok(doc_id)
    }

    /// Log a knowledge-graph node click.
    pub fn log_node_click(
        &self,
        course_id: &str,
        node_id: &str,
        node_label: &str,
        node_type: Option<&str>,
    ) -> Result<String> {
        let doc_id = Uuid::new_v4().to_string();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO analytics_events
             (doc_id, course_id, event_type, node_id, node_label, node_type, created_at)
             VALUES (?1, ?2, 'kg_click', ?3, ?4, ?5, ?6)",
            params![doc_id, course_id, node_id, node_label, node_type, Utc::now().timestamp()],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(doc_id)
    }

    /// Attach a student rating to a logged answer.
    pub fn rate_answer(&self, doc_id: &str, rating: &str) -> Result<()> {
        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE analytics_events SET rating = ?2 WHERE doc_id = ?1",
                params![doc_id, rating],
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        if updated == 0 {
            return Err(Error::NotFound(format!("event {doc_id}")));
        }
        Ok(())
    }
}

impl EventSource for CourseStore {
    /// Chat events for a course in log order, ready for vector extraction.
    fn get_events(&self, course_id: &str) -> Result<Vec<QueryEvent>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT doc_id, query_text, query_vector, created_at
                 FROM analytics_events
                 WHERE course_id = ?1 AND event_type = 'chat'
                 ORDER BY created_at, rowid",
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![course_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut events = Vec::new();
        for row in rows {
            let (doc_id, query_text, vector_json, created_at) =
                row.map_err(|e| Error::Database(e.to_string()))?;
            let query_vector = match vector_json {
                Some(json) => Some(serde_json::from_str(&json)?),
                None => None,
            };
            events.push(QueryEvent {
                doc_id,
                query_text: query_text.unwrap_or_default(),
                query_vector,
                timestamp: DateTime::<Utc>::from_timestamp(created_at, 0)
                    .unwrap_or_else(Utc::now),
            });
        }
        Ok(events)
    }
}

impl ReportStore for CourseStore {
    fn save_report(&self, course_id: &str, report: &AnalyticsReport) -> Result<()> {
        let json = serde_json::to_string(report)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO analytics_reports (course_id, report_json, generated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(course_id) DO UPDATE SET report_json = ?2, generated_at = ?3",
            params![course_id, json, report.generated_at.timestamp()],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    fn get_report(&self, course_id: &str) -> Result<Option<AnalyticsReport>> {
        let conn = self.conn.lock();
        let json: Option<String> = conn
            .query_row(
                "SELECT report_json FROM analytics_reports WHERE course_id = ?1",
                params![course_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

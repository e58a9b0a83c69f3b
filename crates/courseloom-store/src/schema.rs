//! Database schema SQL.

/// Course documents, the analytics event log, and persisted reports.
/// Graph snapshots are stored as the same three JSON strings the builder
/// exchanges, so the snapshot triple is always written together.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS courses (
    course_id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    corpus_id TEXT,
    indexed_files TEXT,
    kg_nodes TEXT,
    kg_edges TEXT,
    kg_data TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER
);

CREATE TABLE IF NOT EXISTS analytics_events (
    doc_id TEXT PRIMARY KEY,
    course_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    query_text TEXT,
    answer_text TEXT,
    sources TEXT,
    query_vector TEXT,
    node_id TEXT,
    node_label TEXT,
    node_type TEXT,
    rating TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_course_type
    ON analytics_events(course_id, event_type, created_at);

CREATE TABLE IF NOT EXISTS analytics_reports (
    course_id TEXT PRIMARY KEY,
    report_json TEXT NOT NULL,
    generated_at INTEGER NOT NULL
);
"#;

//! Cluster labeling and report assembly.

use std::collections::BTreeMap;

use chrono::Utc;
use courseloom_core::{Error, Result};
use courseloom_rag::TextGenerator;
use tracing::{info, warn};

use crate::cluster::{cluster_vectors, ClusterCount, Clustering};
use crate::types::{AnalyticsReport, ClusterSummary, EventSource, ReportStatus, ReportStore};
use crate::vectors::extract_vectors;

/// Queries shown to the labeler per cluster.
const LABEL_SAMPLE: usize = 10;
/// Example queries kept in the report per cluster.
const EXAMPLES_PER_CLUSTER: usize = 5;

/// Run the full analytics pipeline for a course and persist the report.
///
/// The run is atomic: a labeler or event-source failure propagates before
/// anything is saved, so the previous report (if any) stays retrievable.
/// An empty event log is a successful run and persists a `no_data` report.
pub fn run_daily_analytics(
    course_id: &str,
    k: ClusterCount,
    events: &dyn EventSource,
    labeler: &dyn TextGenerator,
    reports: &dyn ReportStore,
) -> Result<AnalyticsReport> {
    let all_events = events.get_events(course_id)?;
    let (vectors, doc_ids) = extract_vectors(&all_events);
    let skipped = all_events.len() - vectors.len();
    info!(
        "Analytics for {course_id}: {} events, {} with vectors",
        all_events.len(),
        vectors.len()
    );

    if vectors.is_empty() {
        let report = AnalyticsReport::no_data(skipped);
        reports.save_report(course_id, &report)?;
        return Ok(report);
    }

    let clustering = match cluster_vectors(&vectors, k) {
        Ok(c) => c,
        Err(Error::InsufficientData(reason)) => {
            // Not enough spread to auto-detect; fall back to one cluster.
            warn!("Auto-detect failed ({reason}); using a single cluster");
            cluster_vectors(&vectors, ClusterCount::Fixed(1))?
        }
        Err(e) => return Err(e),
    };

    let texts: BTreeMap<&str, &str> = all_events
        .iter()
        .map(|e| (e.doc_id.as_str(), e.query_text.as_str()))
        .collect();

    let mut clusters: BTreeMap<String, ClusterSummary> = BTreeMap::new();
    for cluster in 0..clustering.num_clusters() {
        let mut summary = summarize_cluster(cluster, &clustering, &doc_ids, &texts);
        if summary.count == 0 {
            continue;
        }
        let label = label_cluster(labeler, cluster, &summary)?;
        summary.example_queries.truncate(EXAMPLES_PER_CLUSTER);
        clusters.insert(disambiguate(&clusters, &label), summary);
    }

    let report = AnalyticsReport {
        status: ReportStatus::Complete,
        total_queries: vectors.len(),
        skipped_no_vector: skipped,
        num_clusters: clusters.len(),
        clusters,
        generated_at: Utc::now(),
    };
    reports.save_report(course_id, &report)?;
    info!(
        "Analytics for {course_id} complete: {} clusters over {} queries",
        report.num_clusters, report.total_queries
    );
    Ok(report)
}

/// Fetch the persisted report for a course. `None` when no run has
/// completed yet; reads never compute anything.
pub fn get_analytics_report(
    course_id: &str,
    reports: &dyn ReportStore,
) -> Result<Option<AnalyticsReport>> {
    reports.get_report(course_id)
}

fn summarize_cluster(
    cluster: usize,
    clustering: &Clustering,
    doc_ids: &[String],
    texts: &BTreeMap<&str, &str>,
) -> ClusterSummary {
    let member_ids: Vec<String> = clustering
        .assignments
        .iter()
        .zip(doc_ids)
        .filter(|(a, _)| **a == cluster)
        .map(|(_, id)| id.clone())
        .collect();

    let member_texts: Vec<String> = member_ids
        .iter()
        .filter_map(|id| texts.get(id.as_str()))
        .map(|t| t.to_string())
        .collect();

    ClusterSummary {
        count: member_ids.len(),
        example_queries: member_texts.into_iter().take(LABEL_SAMPLE).collect(),
        doc_ids: member_ids,
    }
}

/// Ask the generation collaborator for one short descriptive label.
fn label_cluster(
    labeler: &dyn TextGenerator,
    cluster: usize,
    summary: &ClusterSummary,
) -> Result<String> {
    let sample = summary
        .example_queries
        .iter()
        .take(LABEL_SAMPLE)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = format!(
        "These student questions were grouped together by similarity. Give \
         the group one short descriptive label of at most four words (for \
         example: \"Test Questions\"). Return only the label.\n\n{sample}"
    );
    let label = labeler.generate(&prompt)?.trim().to_string();
    if label.is_empty() {
        Ok(format!("Cluster {}", cluster + 1))
    } else {
        Ok(label)
    }
}

/// Two clusters can come back with the same label; they stay separate
/// entries, with a numeric suffix on the later ones.
fn disambiguate(clusters: &BTreeMap<String, ClusterSummary>, label: &str) -> String {
    if !clusters.contains_key(label) {
        return label.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{label} ({n})");
        if !clusters.contains_key(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QueryEvent;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};

    struct FixedEvents(Vec<QueryEvent>);

    impl EventSource for FixedEvents {
        fn get_events(&self, _course_id: &str) -> Result<Vec<QueryEvent>> {
            Ok(self.0.clone())
        }
    }

    /// Returns scripted labels in order; errors once the script runs out
    /// if `fail_after` is set.
    struct ScriptedLabeler {
        labels: Mutex<VecDeque<String>>,
        fail_when_empty: bool,
    }

    impl ScriptedLabeler {
        fn new(labels: &[&str]) -> Self {
            Self {
                labels: Mutex::new(labels.iter().map(|l| l.to_string()).collect()),
                fail_when_empty: false,
            }
        }

        fn failing_after(labels: &[&str]) -> Self {
            let mut s = Self::new(labels);
            s.fail_when_empty = true;
            s
        }
    }

    impl TextGenerator for ScriptedLabeler {
        fn generate(&self, _prompt: &str) -> Result<String> {
            match self.labels.lock().pop_front() {
                Some(label) => Ok(label),
                None if self.fail_when_empty => {
                    Err(Error::Collaborator("generation backend down".into()))
                }
                None => Ok(String::new()),
            }
        }
    }

    #[derive(Default)]
    struct MemoryReports(Mutex<HashMap<String, AnalyticsReport>>);

    impl ReportStore for MemoryReports {
        fn save_report(&self, course_id: &str, report: &AnalyticsReport) -> Result<()> {
            self.0.lock().insert(course_id.to_string(), report.clone());
            Ok(())
        }

        fn get_report(&self, course_id: &str) -> Result<Option<AnalyticsReport>> {
            Ok(self.0.lock().get(course_id).cloned())
        }
    }

    fn event(doc_id: &str, text: &str, vector: Option<Vec<f32>>) -> QueryEvent {
        QueryEvent {
            doc_id: doc_id.into(),
            query_text: text.into(),
            query_vector: vector,
            timestamp: Utc::now(),
        }
    }

    fn sample_events() -> Vec<QueryEvent> {
        vec![
            event("1", "What is a test?", Some(vec![0.1, 0.2, 0.3])),
            event("2", "How does this work?", Some(vec![0.7, 0.8, 0.9])),
            event("3", "Another question", Some(vec![0.72, 0.81, 0.9])),
            event("4", "More testing", Some(vec![0.1, 0.2, 0.31])),
            event("5", "Final test", Some(vec![0.11, 0.2, 0.3])),
        ]
    }

    #[test]
    fn test_full_run_labels_and_persists() {
        let events = FixedEvents(sample_events());
        let labeler = ScriptedLabeler::new(&["Test Questions", "General Questions"]);
        let reports = MemoryReports::default();

        let report =
            run_daily_analytics("course1", ClusterCount::Fixed(2), &events, &labeler, &reports)
                .unwrap();

        assert_eq!(report.status, ReportStatus::Complete);
        assert_eq!(report.total_queries, 5);
        assert_eq!(report.num_clusters, 2);
        assert_eq!(report.clusters["Test Questions"].count, 3);
        assert_eq!(report.clusters["General Questions"].count, 2);
        assert_eq!(
            report.clusters["Test Questions"].doc_ids,
            vec!["1", "4", "5"]
        );
        assert!(reports.get_report("course1").unwrap().is_some());
    }

    #[test]
    fn test_vectorless_events_are_counted_not_clustered() {
        let mut all = sample_events();
        all.push(event("6", "no vector", None));
        let events = FixedEvents(all);
        let labeler = ScriptedLabeler::new(&["A", "B"]);
        let reports = MemoryReports::default();

        let report =
            run_daily_analytics("course1", ClusterCount::Fixed(2), &events, &labeler, &reports)
                .unwrap();
        assert_eq!(report.total_queries, 5);
        assert_eq!(report.skipped_no_vector, 1);
    }

    #[test]
    fn test_stale_dimension_events_are_skipped_not_fatal() {
        // An embedding model change left an old 2-dim vector in the log
        // ahead of the current 3-dim events. The run completes; the stale
        // event is counted with the skipped ones.
        let mut all = vec![event("0", "old question", Some(vec![0.5, 0.5]))];
        all.extend(sample_events());
        let events = FixedEvents(all);
        let labeler = ScriptedLabeler::new(&["Test Questions", "General Questions"]);
        let reports = MemoryReports::default();

        let report =
            run_daily_analytics("course1", ClusterCount::Fixed(2), &events, &labeler, &reports)
                .unwrap();
        assert_eq!(report.status, ReportStatus::Complete);
        assert_eq!(report.total_queries, 5);
        assert_eq!(report.skipped_no_vector, 1);
        assert!(!report
            .clusters
            .values()
            .any(|c| c.doc_ids.contains(&"0".to_string())));
    }

    #[test]
    fn test_no_events_persists_no_data_report() {
        let events = FixedEvents(Vec::new());
        let labeler = ScriptedLabeler::new(&[]);
        let reports = MemoryReports::default();

        let report =
            run_daily_analytics("course1", ClusterCount::Auto, &events, &labeler, &reports)
                .unwrap();
        assert_eq!(report.status, ReportStatus::NoData);
        assert_eq!(report.num_clusters, 0);
        let stored = reports.get_report("course1").unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::NoData);
    }

    #[test]
    fn test_labeler_failure_aborts_without_persisting() {
        let events = FixedEvents(sample_events());
        let labeler = ScriptedLabeler::failing_after(&["Only One Label"]);
        let reports = MemoryReports::default();

        let err =
            run_daily_analytics("course1", ClusterCount::Fixed(2), &events, &labeler, &reports)
                .unwrap_err();
        assert!(matches!(err, Error::Collaborator(_)));
        assert!(reports.get_report("course1").unwrap().is_none());
    }

    #[test]
    fn test_identical_labels_stay_separate_entries() {
        let events = FixedEvents(sample_events());
        let labeler = ScriptedLabeler::new(&["Homework", "Homework"]);
        let reports = MemoryReports::default();

        let report =
            run_daily_analytics("course1", ClusterCount::Fixed(2), &events, &labeler, &reports)
                .unwrap();
        assert_eq!(report.num_clusters, 2);
        assert!(report.clusters.contains_key("Homework"));
        assert!(report.clusters.contains_key("Homework (2)"));
    }

    #[test]
    fn test_auto_detect_falls_back_to_single_cluster() {
        // All vectors identical: auto-detect cannot proceed.
        let events = FixedEvents(vec![
            event("1", "q1", Some(vec![0.5, 0.5])),
            event("2", "q2", Some(vec![0.5, 0.5])),
            event("3", "q3", Some(vec![0.5, 0.5])),
        ]);
        let labeler = ScriptedLabeler::new(&["Everything"]);
        let reports = MemoryReports::default();

        let report =
            run_daily_analytics("course1", ClusterCount::Auto, &events, &labeler, &reports)
                .unwrap();
        assert_eq!(report.num_clusters, 1);
        assert_eq!(report.clusters["Everything"].count, 3);
    }

    #[test]
    fn test_get_report_absent() {
        let reports = MemoryReports::default();
        assert!(get_analytics_report("nope", &reports).unwrap().is_none());
    }
}

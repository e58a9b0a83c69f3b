//! Vector extraction from logged query events.

use ndarray::Array1;
use tracing::warn;

use crate::types::QueryEvent;

/// Pull the embedding vectors out of a batch of events, keeping the doc id
/// for each surviving vector. Events without a vector are skipped; the two
/// returned sequences stay index-aligned and in input order, which the
/// clustering caller relies on to map assignments back to doc ids.
///
/// The log can span an embedding model change, so vectors of a stale
/// dimension may coexist with current ones. The most recent vector sets
/// the current dimension; events with a different one are skipped like
/// vectorless events.
pub fn extract_vectors(events: &[QueryEvent]) -> (Vec<Array1<f32>>, Vec<String>) {
    let Some(dim) = events
        .iter()
        .rev()
        .find_map(|e| e.query_vector.as_ref().map(Vec::len))
    else {
        return (Vec::new(), Vec::new());
    };

    let mut vectors = Vec::with_capacity(events.len());
    let mut doc_ids = Vec::with_capacity(events.len());
    for event in events {
        match &event.query_vector {
            Some(vector) if vector.len() == dim => {
                vectors.push(Array1::from_vec(vector.clone()));
                doc_ids.push(event.doc_id.clone());
            }
            Some(vector) => {
                warn!(
                    "Skipping {}: {}-dim vector, current dimension is {dim}",
                    event.doc_id,
                    vector.len()
                );
            }
            None => {}
        }
    }
    (vectors, doc_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(doc_id: &str, vector: Option<Vec<f32>>) -> QueryEvent {
        QueryEvent {
            doc_id: doc_id.into(),
            query_text: format!("question {doc_id}"),
            query_vector: vector,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_skips_vectorless_events_and_keeps_alignment() {
        let events = vec![
            event("1", Some(vec![0.1, 0.2])),
            event("2", None),
            event("3", Some(vec![0.3, 0.4])),
        ];
        let (vectors, doc_ids) = extract_vectors(&events);
        assert_eq!(vectors.len(), 2);
        assert_eq!(doc_ids, vec!["1", "3"]);
        assert_eq!(vectors[0].to_vec(), vec![0.1, 0.2]);
        assert_eq!(vectors[1].to_vec(), vec![0.3, 0.4]);
    }

    #[test]
    fn test_empty_input() {
        let (vectors, doc_ids) = extract_vectors(&[]);
        assert!(vectors.is_empty());
        assert!(doc_ids.is_empty());
    }

    #[test]
    fn test_stale_dimension_vectors_are_skipped() {
        // The log spans an embedding model change: the oldest events carry
        // 2-dim vectors, the newest 3-dim. Only the current dimension
        // survives.
        let events = vec![
            event("1", Some(vec![0.1, 0.2])),
            event("2", Some(vec![0.1, 0.2, 0.3])),
            event("3", Some(vec![0.9, 0.8])),
            event("4", Some(vec![0.4, 0.5, 0.6])),
        ];
        let (vectors, doc_ids) = extract_vectors(&events);
        assert_eq!(doc_ids, vec!["2", "4"]);
        assert!(vectors.iter().all(|v| v.len() == 3));
    }
}

//! Builder operations over graph snapshots.
//!
//! Every operation is a pure function of its inputs: it either returns a
//! new validated snapshot or an error, never a partially-mutated one. A
//! retrieval failure for any topic aborts the whole build — deliberately
//! stricter than the best-effort corpus provisioning path.

use std::collections::HashMap;

use courseloom_core::{Error, Result};
use courseloom_rag::{RetrievalAnswer, RetrievedSource, Retriever, TextGenerator};
use tracing::{debug, info};

use crate::types::{FileRef, GraphEdge, GraphNode, GraphSnapshot, NodeGroup, TopicData};

/// Build the initial graph from the professor's topic list and the course
/// file catalog. File nodes come first in catalog order, then topic nodes
/// in topic order with ids `topic_1`, `topic_2`, …
pub fn build_initial(
    topics: &[String],
    corpus_id: &str,
    files: &[FileRef],
    retriever: &dyn Retriever,
) -> Result<GraphSnapshot> {
    ensure_configured(retriever)?;

    let mut snapshot = GraphSnapshot::new();
    for file in files {
        snapshot.nodes.push(GraphNode {
            id: file.id.clone(),
            label: file.display_name.clone(),
            group: NodeGroup::for_file(&file.display_name),
        });
    }

    for (i, topic) in topics.iter().enumerate() {
        let index = i as u32 + 1;
        let answer = retriever.query(corpus_id, topic)?;
        attach_topic(&mut snapshot, index, topic, answer);
    }

    snapshot.validate()?;
    info!(
        "Built graph: {} nodes ({} topics, {} files), {} edges",
        snapshot.nodes.len(),
        topics.len(),
        files.len(),
        snapshot.edges.len()
    );
    Ok(snapshot)
}

/// Add one topic to an existing snapshot, returning the new snapshot. The
/// new topic id is the highest existing topic index plus one; removed
/// indices are never reused.
pub fn add_topic(
    name: &str,
    corpus_id: &str,
    snapshot: &GraphSnapshot,
    retriever: &dyn Retriever,
) -> Result<GraphSnapshot> {
    ensure_configured(retriever)?;

    let index = snapshot.next_topic_index();
    let answer = retriever.query(corpus_id, name)?;

    let mut next = snapshot.clone();
    attach_topic(&mut next, index, name, answer);
    next.validate()?;
    info!("Added topic_{index} ({name})");
    Ok(next)
}

/// Remove a topic node, its outgoing edges, and its data entry. Removing
/// an unknown id is a no-op: the input snapshot is returned unchanged.
/// File nodes stay even when the removal leaves them edge-less.
pub fn remove_topic(topic_id: &str, snapshot: &GraphSnapshot) -> GraphSnapshot {
    let exists = snapshot
        .nodes
        .iter()
        .any(|n| n.id == topic_id && n.group.is_topic());
    if !exists {
        debug!("remove_topic: no topic node {topic_id}, leaving snapshot unchanged");
        return snapshot.clone();
    }

    let mut next = snapshot.clone();
    next.nodes.retain(|n| n.id != topic_id);
    next.edges.retain(|e| e.from != topic_id);
    next.data.remove(topic_id);
    info!("Removed {topic_id}");
    next
}

/// Ask the generation collaborator to distill a comma-separated topic list
/// from document summaries. Order is preserved; entries are trimmed and
/// blanks dropped, but duplicates are kept as returned.
pub fn extract_topics_from_summaries(
    summaries: &[String],
    generator: &dyn TextGenerator,
) -> Result<Vec<String>> {
    let prompt = format!(
        "The following are summaries of course materials. Extract the main \
         topics covered as a single comma-separated list. Return only the \
         list.\n\n{}",
        summaries.join("\n\n"),
    );
    let response = generator.generate(&prompt)?;

    Ok(response
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect())
}

fn ensure_configured(retriever: &dyn Retriever) -> Result<()> {
    if retriever.is_configured() {
        Ok(())
    } else {
        Err(Error::Config("retrieval collaborator is not configured".into()))
    }
}

/// Append a topic node, its resolved citation edges, and its data entry.
/// Sources that do not resolve to a file node produce no edge; one edge
/// per (topic, file) pair even if the retriever repeats a source.
fn attach_topic(snapshot: &mut GraphSnapshot, index: u32, name: &str, answer: RetrievalAnswer) {
    let file_ids: HashMap<&str, &str> = snapshot
        .nodes
        .iter()
        .filter(|n| !n.group.is_topic())
        .map(|n| (n.label.as_str(), n.id.as_str()))
        .collect();

    let topic_id = format!("topic_{index}");

    let mut sources: Vec<RetrievedSource> = Vec::new();
    let mut edges: Vec<GraphEdge> = Vec::new();
    for source in answer.sources {
        if sources.iter().any(|s| s.filename == source.filename) {
            continue;
        }
        if let Some(file_id) = file_ids.get(source.filename.as_str()) {
            edges.push(GraphEdge {
                from: topic_id.clone(),
                to: (*file_id).to_string(),
            });
        } else {
            debug!("{topic_id}: source {} has no file node", source.filename);
        }
        sources.push(source);
    }

    snapshot.nodes.push(GraphNode {
        id: topic_id.clone(),
        label: name.to_string(),
        group: NodeGroup::Topic,
    });
    snapshot.edges.extend(edges);
    snapshot.data.insert(
        topic_id,
        TopicData {
            summary: answer.summary,
            sources,
        },
    );
}

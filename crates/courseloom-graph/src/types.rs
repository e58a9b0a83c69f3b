//! Graph snapshot value types and structural validation.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use courseloom_core::{Error, Result};
use courseloom_rag::RetrievedSource;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A course file as supplied by the LMS catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// External file id, used verbatim as the file node id.
    pub id: String,
    pub display_name: String,
}

impl FileRef {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Node kind. Serialized as `"topic"` or `"file_<ext>"` at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeGroup {
    Topic,
    /// A file node, tagged with the lowercased extension (`pdf`, `docx`,
    /// `unknown` when the display name has none).
    File(String),
}

impl NodeGroup {
    /// Derive the file group from a display name's extension.
    pub fn for_file(display_name: &str) -> Self {
        let ext = display_name
            .rsplit_once('.')
            .map(|(stem, ext)| (stem, ext.to_ascii_lowercase()))
            .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
            .map(|(_, ext)| ext)
            .unwrap_or_else(|| "unknown".to_string());
        NodeGroup::File(ext)
    }

    pub fn is_topic(&self) -> bool {
        matches!(self, NodeGroup::Topic)
    }
}

impl fmt::Display for NodeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeGroup::Topic => write!(f, "topic"),
            NodeGroup::File(ext) => write!(f, "file_{ext}"),
        }
    }
}

impl Serialize for NodeGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "topic" {
            Ok(NodeGroup::Topic)
        } else if let Some(ext) = raw.strip_prefix("file_") {
            Ok(NodeGroup::File(ext.to_string()))
        } else {
            Err(D::Error::custom(format!("unknown node group: {raw}")))
        }
    }
}

/// A node in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub group: NodeGroup,
}

/// A directed edge, always topic → file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

/// Generated summary and citations for one topic node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicData {
    pub summary: String,
    pub sources: Vec<RetrievedSource>,
}

/// One graph state: the (nodes, edges, data) triple, always persisted and
/// exchanged together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub data: BTreeMap<String, TopicData>,
}

impl GraphSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the structural invariants: unique node ids, edges whose
    /// endpoints exist (topic → file), and data keys that name existing
    /// topic nodes. Builder operations validate every snapshot they return.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(Error::InvalidGraph(format!("duplicate node id: {}", node.id)));
            }
        }

        let topic_ids: HashSet<&str> = self
            .nodes
            .iter()
            .filter(|n| n.group.is_topic())
            .map(|n| n.id.as_str())
            .collect();

        for edge in &self.edges {
            if !topic_ids.contains(edge.from.as_str()) {
                return Err(Error::InvalidGraph(format!(
                    "edge references missing topic node: {}",
                    edge.from
                )));
            }
            if !ids.contains(edge.to.as_str()) {
                return Err(Error::InvalidGraph(format!(
                    "edge references missing node: {}",
                    edge.to
                )));
            }
            // Edges run topic -> file only.
            if topic_ids.contains(edge.to.as_str()) {
                return Err(Error::InvalidGraph(format!(
                    "edge target is not a file node: {}",
                    edge.to
                )));
            }
        }

        for key in self.data.keys() {
            if !topic_ids.contains(key.as_str()) {
                return Err(Error::InvalidGraph(format!(
                    "data references missing topic node: {key}"
                )));
            }
        }

        Ok(())
    }

    /// Parse a topic node id (`topic_N`) into its 1-based index.
    pub fn topic_index(id: &str) -> Option<u32> {
        id.strip_prefix("topic_").and_then(|n| n.parse().ok())
    }

    /// Next topic index: max existing topic index + 1, or 1 for a graph
    /// with no topics. Indices are never reused within a session.
    pub fn next_topic_index(&self) -> u32 {
        self.nodes
            .iter()
            .filter(|n| n.group.is_topic())
            .filter_map(|n| Self::topic_index(&n.id))
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Serialize to the persisted triple of JSON strings.
    pub fn to_json_parts(&self) -> Result<(String, String, String)> {
        Ok((
            serde_json::to_string(&self.nodes)?,
            serde_json::to_string(&self.edges)?,
            serde_json::to_string(&self.data)?,
        ))
    }

    /// Rebuild a snapshot from the persisted triple of JSON strings.
    pub fn from_json_parts(nodes: &str, edges: &str, data: &str) -> Result<Self> {
        Ok(Self {
            nodes: serde_json::from_str(nodes)?,
            edges: serde_json::from_str(edges)?,
            data: serde_json::from_str(data)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: &str, label: &str) -> GraphNode {
        GraphNode {
            id: id.into(),
            label: label.into(),
            group: NodeGroup::Topic,
        }
    }

    fn file(id: &str, label: &str) -> GraphNode {
        GraphNode {
            id: id.into(),
            label: label.into(),
            group: NodeGroup::for_file(label),
        }
    }

    #[test]
    fn test_group_from_extension() {
        assert_eq!(NodeGroup::for_file("Chapter 3.pdf"), NodeGroup::File("pdf".into()));
        assert_eq!(NodeGroup::for_file("Notes.DOCX"), NodeGroup::File("docx".into()));
        assert_eq!(NodeGroup::for_file("README"), NodeGroup::File("unknown".into()));
        assert_eq!(NodeGroup::for_file(".hidden"), NodeGroup::File("unknown".into()));
    }

    #[test]
    fn test_group_serde_round_trip() {
        let json = serde_json::to_string(&NodeGroup::File("pdf".into())).unwrap();
        assert_eq!(json, "\"file_pdf\"");
        let parsed: NodeGroup = serde_json::from_str("\"topic\"").unwrap();
        assert_eq!(parsed, NodeGroup::Topic);
        assert!(serde_json::from_str::<NodeGroup>("\"widget\"").is_err());
    }

    #[test]
    fn test_validate_ok() {
        let mut snapshot = GraphSnapshot::new();
        snapshot.nodes = vec![file("101", "Chapter 3.pdf"), topic("topic_1", "Mitosis")];
        snapshot.edges = vec![GraphEdge { from: "topic_1".into(), to: "101".into() }];
        snapshot.data.insert(
            "topic_1".into(),
            TopicData { summary: "s".into(), sources: vec![] },
        );
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_validate_dangling_edge() {
        let mut snapshot = GraphSnapshot::new();
        snapshot.nodes = vec![topic("topic_1", "Mitosis")];
        snapshot.edges = vec![GraphEdge { from: "topic_1".into(), to: "999".into() }];
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidGraph(_)));
    }

    #[test]
    fn test_validate_topic_to_topic_edge() {
        let mut snapshot = GraphSnapshot::new();
        snapshot.nodes = vec![topic("topic_1", "Mitosis"), topic("topic_2", "Meiosis")];
        snapshot.edges = vec![GraphEdge { from: "topic_1".into(), to: "topic_2".into() }];
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidGraph(_)));
    }

    #[test]
    fn test_validate_duplicate_id() {
        let mut snapshot = GraphSnapshot::new();
        snapshot.nodes = vec![topic("topic_1", "A"), topic("topic_1", "B")];
        assert!(matches!(snapshot.validate(), Err(Error::InvalidGraph(_))));
    }

    #[test]
    fn test_validate_orphan_data_key() {
        let mut snapshot = GraphSnapshot::new();
        snapshot.data.insert(
            "topic_9".into(),
            TopicData { summary: "s".into(), sources: vec![] },
        );
        assert!(matches!(snapshot.validate(), Err(Error::InvalidGraph(_))));
    }

    #[test]
    fn test_next_topic_index() {
        let mut snapshot = GraphSnapshot::new();
        assert_eq!(snapshot.next_topic_index(), 1);
        snapshot.nodes.push(topic("topic_3", "C"));
        snapshot.nodes.push(topic("topic_1", "A"));
        assert_eq!(snapshot.next_topic_index(), 4);
    }

    #[test]
    fn test_json_parts_round_trip() {
        let mut snapshot = GraphSnapshot::new();
        snapshot.nodes = vec![file("101", "Chapter 3.pdf"), topic("topic_1", "Mitosis")];
        snapshot.edges = vec![GraphEdge { from: "topic_1".into(), to: "101".into() }];
        snapshot.data.insert(
            "topic_1".into(),
            TopicData { summary: "s".into(), sources: vec![] },
        );
        let (nodes, edges, data) = snapshot.to_json_parts().unwrap();
        let restored = GraphSnapshot::from_json_parts(&nodes, &edges, &data).unwrap();
        assert_eq!(restored, snapshot);
    }
}

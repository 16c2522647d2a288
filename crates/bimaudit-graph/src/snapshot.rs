//! JSON graph snapshots.
//!
//! A snapshot is the hand-off format between whatever materialized the
//! building graph (IFC → RDF → property graph) and the auditor:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "key": "w1", "class": "IfcWall", "attrs": { "label": "W-12", "uri": "urn:elem:42" } },
//!     { "key": "s1", "class": "IfcBuildingStorey" }
//!   ],
//!   "edges": [ { "from": "w1", "relation": "isContainedIn", "to": "s1" } ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{GraphError, PropertyGraph};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub key: String,
    pub class: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEdge {
    pub from: String,
    pub relation: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,
    #[serde(default)]
    pub edges: Vec<SnapshotEdge>,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("edge {from} -[{relation}]-> {to} refers to unknown node `{missing}`")]
    DanglingEdge {
        from: String,
        relation: String,
        to: String,
        missing: String,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl GraphSnapshot {
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the in-memory graph. Node keys must be unique and every edge
    /// endpoint must name a node.
    pub fn into_graph(self) -> Result<PropertyGraph, SnapshotError> {
        let mut graph = PropertyGraph::new();
        for node in &self.nodes {
            let attrs: Vec<(&str, &str)> = node
                .attrs
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            graph.add_node(&node.key, &node.class, attrs)?;
        }

        for edge in &self.edges {
            let dangling = |missing: &str| SnapshotError::DanglingEdge {
                from: edge.from.clone(),
                relation: edge.relation.clone(),
                to: edge.to.clone(),
                missing: missing.to_string(),
            };
            let source = graph.node_id(&edge.from).ok_or_else(|| dangling(&edge.from))?;
            let target = graph.node_id(&edge.to).ok_or_else(|| dangling(&edge.to))?;
            graph.add_edge(source, &edge.relation, target)?;
        }

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "nodes": [
            { "key": "s1", "class": "IfcBuildingStorey", "attrs": { "label": "Level 1" } },
            { "key": "w1", "class": "IfcWall", "attrs": { "label": "W-12", "uri": "urn:elem:42" } }
        ],
        "edges": [ { "from": "w1", "relation": "isContainedIn", "to": "s1" } ]
    }"#;

    #[test]
    fn loads_nodes_and_edges() {
        let graph = GraphSnapshot::from_json(SAMPLE)
            .and_then(GraphSnapshot::into_graph)
            .expect("load");
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        let wall = graph.node_id("w1").expect("w1");
        let storey = graph.node_id("s1").expect("s1");
        assert!(graph.targets(wall, "isContainedIn").contains(storey));
        assert_eq!(graph.attr(wall, "uri"), Some("urn:elem:42"));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let graph = GraphSnapshot::from_json("{}")
            .and_then(GraphSnapshot::into_graph)
            .expect("load");
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn dangling_edges_are_rejected() {
        let err = GraphSnapshot::from_json(
            r#"{ "nodes": [ { "key": "w1", "class": "IfcWall" } ],
                 "edges": [ { "from": "w1", "relation": "isContainedIn", "to": "nowhere" } ] }"#,
        )
        .and_then(GraphSnapshot::into_graph)
        .expect_err("dangling");
        assert!(
            matches!(err, SnapshotError::DanglingEdge { ref missing, .. } if missing == "nowhere"),
            "{err}"
        );
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = GraphSnapshot::from_json(
            r#"{ "nodes": [ { "key": "a", "class": "IfcWall" }, { "key": "a", "class": "IfcSlab" } ] }"#,
        )
        .and_then(GraphSnapshot::into_graph)
        .expect_err("duplicate");
        assert!(matches!(err, SnapshotError::Graph(GraphError::DuplicateKey(_))), "{err}");
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let err = GraphSnapshot::load(&missing).expect_err("missing file");
        assert!(err.to_string().contains("missing.json"), "{err}");
    }
}

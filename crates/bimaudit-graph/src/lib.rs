//! Building property graph.
//!
//! A compact, read-mostly property graph used as the audit engine's graph
//! store when no external database is involved:
//!
//! 1. **String interning**: classes, attribute names/values and relation types
//!    are stored once and referenced by `StrId`.
//! 2. **Class index**: class → bitmap of node ids, so "all `IfcWall` nodes" is
//!    a single lookup.
//! 3. **Adjacency bitmaps**: (source, relation) → bitmap of targets, so
//!    one-hop existence checks are bitmap intersections.
//!
//! Every node carries exactly one class label and a set of string attributes.
//! Edges are directed and typed.
//!
//! ## Modules
//!
//! - `snapshot`: JSON snapshot format and loader
//! - `pattern`: the containment-existence pattern understood by [`MemoryStore`]
//! - `store`: the [`GraphStore`] boundary trait and [`MemoryStore`]

pub mod pattern;
pub mod snapshot;
pub mod store;

use ahash::AHashMap;
use roaring::RoaringBitmap;
use std::collections::BTreeMap;
use thiserror::Error;

pub use snapshot::{GraphSnapshot, SnapshotEdge, SnapshotError, SnapshotNode};
pub use store::{GraphStore, MemoryStore, Row, StoreError};

// ============================================================================
// String Interning
// ============================================================================

/// Interned string ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StrId(u32);

impl StrId {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// String interner: maps strings to compact IDs
#[derive(Debug, Default)]
pub struct StringInterner {
    str_to_id: AHashMap<String, StrId>,
    id_to_str: Vec<String>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its ID
    pub fn intern(&mut self, s: &str) -> StrId {
        if let Some(id) = self.str_to_id.get(s) {
            return *id;
        }
        let id = StrId(self.id_to_str.len() as u32);
        self.str_to_id.insert(s.to_string(), id);
        self.id_to_str.push(s.to_string());
        id
    }

    /// Look up an existing ID for a string without inserting.
    pub fn id_of(&self, s: &str) -> Option<StrId> {
        self.str_to_id.get(s).copied()
    }

    pub fn lookup(&self, id: StrId) -> Option<&str> {
        self.id_to_str.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.id_to_str.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_str.is_empty()
    }
}

// ============================================================================
// Node / Edge storage
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("duplicate node key `{0}`")]
    DuplicateKey(String),
    #[error("unknown node id {0}")]
    UnknownNode(u32),
}

/// Columnar node storage
#[derive(Debug, Default)]
struct NodeStore {
    /// node id -> class
    classes: Vec<StrId>,
    /// attr name -> (node id -> value)
    attrs: AHashMap<StrId, AHashMap<u32, StrId>>,
    /// class -> node ids
    class_index: AHashMap<StrId, RoaringBitmap>,
}

impl NodeStore {
    fn add(&mut self, class: StrId, attrs: Vec<(StrId, StrId)>) -> u32 {
        let id = self.classes.len() as u32;
        self.classes.push(class);
        self.class_index.entry(class).or_default().insert(id);
        for (name, value) in attrs {
            self.attrs.entry(name).or_default().insert(id, value);
        }
        id
    }

    fn contains(&self, id: u32) -> bool {
        (id as usize) < self.classes.len()
    }
}

/// Adjacency storage: (source, relation) -> targets
#[derive(Debug, Default)]
struct EdgeStore {
    outgoing: AHashMap<(u32, StrId), RoaringBitmap>,
    len: usize,
}

impl EdgeStore {
    fn add(&mut self, source: u32, relation: StrId, target: u32) {
        if self.outgoing.entry((source, relation)).or_default().insert(target) {
            self.len += 1;
        }
    }
}

/// Resolved view of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeView {
    pub id: u32,
    pub key: String,
    pub class: String,
    pub attrs: BTreeMap<String, String>,
}

// ============================================================================
// PropertyGraph
// ============================================================================

/// In-memory building property graph.
#[derive(Debug, Default)]
pub struct PropertyGraph {
    interner: StringInterner,
    nodes: NodeStore,
    edges: EdgeStore,
    keys: AHashMap<String, u32>,
    key_of: Vec<String>,
}

impl PropertyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node identified by `key` (unique within the graph).
    pub fn add_node(
        &mut self,
        key: &str,
        class: &str,
        attrs: Vec<(&str, &str)>,
    ) -> Result<u32, GraphError> {
        if self.keys.contains_key(key) {
            return Err(GraphError::DuplicateKey(key.to_string()));
        }
        let class_id = self.interner.intern(class);
        let interned: Vec<(StrId, StrId)> = attrs
            .into_iter()
            .map(|(k, v)| (self.interner.intern(k), self.interner.intern(v)))
            .collect();
        let id = self.nodes.add(class_id, interned);
        self.keys.insert(key.to_string(), id);
        self.key_of.push(key.to_string());
        Ok(id)
    }

    /// Add a directed, typed edge. Adding the same edge twice is a no-op.
    pub fn add_edge(&mut self, source: u32, relation: &str, target: u32) -> Result<(), GraphError> {
        for id in [source, target] {
            if !self.nodes.contains(id) {
                return Err(GraphError::UnknownNode(id));
            }
        }
        let relation = self.interner.intern(relation);
        self.edges.add(source, relation, target);
        Ok(())
    }

    pub fn node_id(&self, key: &str) -> Option<u32> {
        self.keys.get(key).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.classes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len
    }

    /// Nodes labelled `class` (empty when the class never occurs).
    pub fn nodes_with_class(&self, class: &str) -> RoaringBitmap {
        self.interner
            .id_of(class)
            .and_then(|id| self.nodes.class_index.get(&id))
            .cloned()
            .unwrap_or_default()
    }

    /// Targets of `relation` edges leaving `source`.
    pub fn targets(&self, source: u32, relation: &str) -> RoaringBitmap {
        self.interner
            .id_of(relation)
            .and_then(|rel| self.edges.outgoing.get(&(source, rel)))
            .cloned()
            .unwrap_or_default()
    }

    pub fn class_of(&self, id: u32) -> Option<&str> {
        let class = self.nodes.classes.get(id as usize)?;
        self.interner.lookup(*class)
    }

    pub fn attr(&self, id: u32, name: &str) -> Option<&str> {
        let name = self.interner.id_of(name)?;
        let value = self.nodes.attrs.get(&name)?.get(&id)?;
        self.interner.lookup(*value)
    }

    pub fn node(&self, id: u32) -> Option<NodeView> {
        let class = self.class_of(id)?.to_string();
        let key = self.key_of.get(id as usize)?.clone();
        let mut attrs = BTreeMap::new();
        for (name, column) in &self.nodes.attrs {
            if let Some(value) = column.get(&id) {
                if let (Some(name), Some(value)) =
                    (self.interner.lookup(*name), self.interner.lookup(*value))
                {
                    attrs.insert(name.to_string(), value.to_string());
                }
            }
        }
        Some(NodeView {
            id,
            key,
            class,
            attrs,
        })
    }

    /// Distinct classes present in the graph with their node counts.
    pub fn class_counts(&self) -> BTreeMap<String, u64> {
        self.nodes
            .class_index
            .iter()
            .filter_map(|(class, ids)| {
                self.interner
                    .lookup(*class)
                    .map(|name| (name.to_string(), ids.len()))
            })
            .collect()
    }
}

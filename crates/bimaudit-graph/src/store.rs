//! Graph store boundary.
//!
//! The audit engine talks to a building graph through [`GraphStore`]: a
//! reachability check and a read-only query runner that returns rows keyed by
//! column name. [`MemoryStore`] implements it over a [`PropertyGraph`]; an
//! adapter for an external graph database implements the same two methods.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::pattern::parse_pattern;
use crate::snapshot::{GraphSnapshot, SnapshotError};
use crate::PropertyGraph;

/// One result row: column name → value.
pub type Row = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store cannot be reached at all.
    #[error("graph store unreachable: {0}")]
    Unreachable(String),
    /// The store refused the query text.
    #[error("query rejected: {0}")]
    Rejected(String),
    /// The query was accepted but failed while running.
    #[error("query failed: {0}")]
    Execution(String),
}

/// Read-only access to a building graph.
pub trait GraphStore {
    /// Cheap liveness check, called once before any rule is audited.
    fn ping(&self) -> Result<(), StoreError>;

    /// Run one query and collect its rows.
    fn run(&self, query: &str) -> Result<Vec<Row>, StoreError>;
}

impl<T: GraphStore + ?Sized> GraphStore for &T {
    fn ping(&self) -> Result<(), StoreError> {
        (**self).ping()
    }

    fn run(&self, query: &str) -> Result<Vec<Row>, StoreError> {
        (**self).run(query)
    }
}

impl<T: GraphStore + ?Sized> GraphStore for Box<T> {
    fn ping(&self) -> Result<(), StoreError> {
        (**self).ping()
    }

    fn run(&self, query: &str) -> Result<Vec<Row>, StoreError> {
        (**self).run(query)
    }
}

impl<T: GraphStore + ?Sized> GraphStore for Arc<T> {
    fn ping(&self) -> Result<(), StoreError> {
        (**self).ping()
    }

    fn run(&self, query: &str) -> Result<Vec<Row>, StoreError> {
        (**self).run(query)
    }
}

/// [`GraphStore`] over an in-memory [`PropertyGraph`].
///
/// Only containment-existence patterns are understood (see
/// [`crate::pattern`]); any other query text is [`StoreError::Rejected`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    graph: PropertyGraph,
}

impl MemoryStore {
    pub fn new(graph: PropertyGraph) -> Self {
        Self { graph }
    }

    pub fn from_snapshot_file(path: &Path) -> Result<Self, SnapshotError> {
        Ok(Self::new(GraphSnapshot::load(path)?.into_graph()?))
    }

    pub fn graph(&self) -> &PropertyGraph {
        &self.graph
    }
}

impl GraphStore for MemoryStore {
    fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn run(&self, query: &str) -> Result<Vec<Row>, StoreError> {
        let pattern = parse_pattern(query).map_err(|e| StoreError::Rejected(e.to_string()))?;
        Ok(pattern.evaluate(&self.graph))
    }
}

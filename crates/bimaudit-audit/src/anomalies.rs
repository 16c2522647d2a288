//! Anomaly identifiers and the run artifact.

use std::collections::BTreeSet;
use std::path::Path;

use bimaudit_graph::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AuditError;

/// Recorded when a result row has no usable identifier.
pub const MISSING_ID: &str = "MISSING_ID";

/// Local name of an element identifier: the text after the last `#`, `/` or
/// `:`. Identifiers without a separator, or ending in one, are kept whole.
///
/// Only the local name is kept, so ids from different namespaces that share
/// one (`urn:elem:42`, `https://b/x#42`) are recorded once.
pub fn local_name(id: &str) -> &str {
    match id.rfind(['#', '/', ':']) {
        Some(idx) if idx + 1 < id.len() => &id[idx + 1..],
        _ => id,
    }
}

/// Identifier recorded for one result row.
pub fn extract_identifier(row: &Row, column: &str) -> String {
    match row.get(column) {
        Some(Value::String(id)) if !id.is_empty() => local_name(id).to_string(),
        _ => MISSING_ID.to_string(),
    }
}

/// Unique element identifiers across one run, kept sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnomalySet {
    ids: BTreeSet<String>,
}

impl AnomalySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the identifier was not already present.
    pub fn insert(&mut self, id: String) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// One identifier per line, sorted, trailing newline.
    pub fn to_artifact(&self) -> String {
        let mut out = String::new();
        for id in &self.ids {
            out.push_str(id);
            out.push('\n');
        }
        out
    }

    /// Write the artifact. An empty set writes nothing and returns `false`.
    pub fn write_artifact(&self, path: &Path) -> Result<bool, AuditError> {
        if self.is_empty() {
            return Ok(false);
        }
        std::fs::write(path, self.to_artifact()).map_err(|source| AuditError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(true)
    }
}

impl Extend<String> for AnomalySet {
    fn extend<T: IntoIterator<Item = String>>(&mut self, iter: T) {
        self.ids.extend(iter);
    }
}

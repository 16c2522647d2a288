use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::AuditError;

/// Default artifact file name for the anomaly set.
pub const DEFAULT_ANOMALY_ARTIFACT: &str = "anomalies_detected.txt";

/// Default number of anomaly rows logged per anomalous rule.
pub const DEFAULT_PREVIEW_LIMIT: usize = 5;

/// Audit run configuration.
///
/// Passed explicitly to the [`Auditor`](crate::Auditor); nothing here is read
/// from the process environment. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Where the anomaly set is written (only when non-empty).
    pub anomaly_artifact: PathBuf,
    /// Rows logged per anomalous rule before the "… and N more" line.
    pub preview_limit: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            anomaly_artifact: PathBuf::from(DEFAULT_ANOMALY_ARTIFACT),
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }
}

impl AuditConfig {
    pub fn from_json(text: &str) -> Result<Self, AuditError> {
        serde_json::from_str(text).map_err(|e| AuditError::Config(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, AuditError> {
        let text = std::fs::read_to_string(path).map_err(|source| AuditError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

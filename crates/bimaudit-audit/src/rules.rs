//! Rule source filtering.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::AuditError;

/// An eligible rule line and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    /// 1-based line number in the rule source.
    pub line_number: usize,
    /// The line with surrounding whitespace removed.
    pub text: String,
}

/// A line is eligible unless it is blank or a `//` / `#` comment.
pub fn is_eligible(line: &str) -> bool {
    let trimmed = line.trim();
    !(trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with('#'))
}

/// Eligible lines of `source`, in order, with their original line numbers.
pub fn eligible_rules(source: &str) -> Vec<RuleRecord> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| is_eligible(line))
        .map(|(idx, line)| RuleRecord {
            line_number: idx + 1,
            text: line.trim().to_string(),
        })
        .collect()
}

pub fn read_rule_file(path: &Path) -> Result<String, AuditError> {
    std::fs::read_to_string(path).map_err(|source| AuditError::Io {
        path: path.to_path_buf(),
        source,
    })
}

//! bimaudit audit engine
//!
//! Drives a rule source through the rule language and a graph store:
//!
//! ```text
//! rules.txt ──► filter ──► parse ──► compile ──► GraphStore::run ──► classify
//!                            │          │               │               │
//!                            └──────────┴── per-rule ───┘               ▼
//!                                         failures            ConformanceReport
//!                                                              + AnomalySet
//! ```
//!
//! ## Counting policy
//!
//! Rules that fail to translate (parse or unknown type) and rules whose query
//! fails in the store are counted separately and excluded from the
//! conformance rate entirely. The rate is over rules that actually ran.

pub mod anomalies;
pub mod config;
pub mod engine;
pub mod report;
pub mod rules;


use std::path::PathBuf;

use bimaudit_dsl::GrammarError;
use bimaudit_graph::StoreError;
use thiserror::Error;

pub use anomalies::{extract_identifier, local_name, AnomalySet, MISSING_ID};
pub use config::AuditConfig;
pub use engine::{AuditRun, Auditor, RuleAudit, RuleOutcome, TranslationError};
pub use report::ConformanceReport;
pub use rules::{eligible_rules, read_rule_file, RuleRecord};

// ============================================================================
// Errors
// ============================================================================

/// Errors that stop a run.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("cannot start audit: {0}")]
    StoreUnreachable(#[source] StoreError),
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error("invalid audit configuration: {0}")]
    Config(String),
    #[error("I/O error on `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

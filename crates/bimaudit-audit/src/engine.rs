//! The audit loop.
//!
//! Each eligible rule goes through `parse → compile → execute → classify`
//! on its own; a failure at any stage is recorded against that rule and the
//! loop moves on. Only a store that cannot be reached at connect time, or an
//! artifact that cannot be written, stops a run.

use std::path::{Path, PathBuf};

use bimaudit_dsl::compiler::{ANOMALOUS_ELEMENT_COLUMN, ID_COLUMN};
use bimaudit_dsl::{
    compile, default_grammar, load_grammar, CompileError, CompiledQuery, Grammar, ParseError,
    TypeVocabulary,
};
use bimaudit_graph::{GraphStore, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::anomalies::{extract_identifier, AnomalySet};
use crate::config::AuditConfig;
use crate::report::ConformanceReport;
use crate::rules::{eligible_rules, RuleRecord};
use crate::AuditError;

/// Why a rule line never reached the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
}

impl TranslationError {
    pub fn token(&self) -> Option<&str> {
        match self {
            TranslationError::Parse(err) => err.found(),
            TranslationError::Compile(err) => Some(err.token()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuleOutcome {
    Conforming,
    Anomalous { rows: Vec<Row> },
    TranslationFailed { message: String },
    ExecutionFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAudit {
    pub line_number: usize,
    pub text: String,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRun {
    pub report: ConformanceReport,
    pub anomalies: AnomalySet,
    pub rules: Vec<RuleAudit>,
    /// Set when the anomaly artifact was written.
    pub artifact: Option<PathBuf>,
}

/// Audits rule sources against one graph store.
///
/// The grammar and vocabulary are fixed at construction and shared by every
/// rule; rules are processed strictly in source order.
pub struct Auditor<S> {
    config: AuditConfig,
    store: S,
    grammar: Grammar,
    vocabulary: TypeVocabulary,
}

impl<S: GraphStore> Auditor<S> {
    /// Check the store is reachable and assemble the auditor.
    pub fn connect(
        config: AuditConfig,
        store: S,
        grammar: Grammar,
        vocabulary: TypeVocabulary,
    ) -> Result<Self, AuditError> {
        if let Err(err) = store.ping() {
            tracing::error!(error = %err, "graph store is not reachable");
            return Err(AuditError::StoreUnreachable(err));
        }
        Ok(Self {
            config,
            store,
            grammar,
            vocabulary,
        })
    }

    /// Load the rule grammar (the bundled one when `grammar` is `None`),
    /// then [`connect`](Self::connect).
    pub fn open(
        config: AuditConfig,
        store: S,
        grammar: Option<&Path>,
        vocabulary: TypeVocabulary,
    ) -> Result<Self, AuditError> {
        let grammar = match grammar {
            Some(path) => load_grammar(path)?,
            None => default_grammar()?,
        };
        Self::connect(config, store, grammar, vocabulary)
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Parse and compile one rule line.
    pub fn translate(&self, text: &str) -> Result<CompiledQuery, TranslationError> {
        let ast = self.grammar.parse(text)?;
        Ok(compile(&ast, &self.vocabulary)?)
    }

    /// Audit one eligible rule.
    pub fn audit_rule(&self, record: &RuleRecord) -> RuleOutcome {
        tracing::info!(line = record.line_number, rule = %record.text, "auditing rule");

        let query = match self.translate(&record.text) {
            Ok(query) => query,
            Err(err) => {
                tracing::warn!(
                    line = record.line_number,
                    token = err.token().unwrap_or("-"),
                    error = %err,
                    "rule could not be translated"
                );
                return RuleOutcome::TranslationFailed {
                    message: err.to_string(),
                };
            }
        };
        tracing::debug!(line = record.line_number, query = %query.text, "compiled rule");

        match self.store.run(&query.text) {
            Ok(rows) if rows.is_empty() => {
                tracing::info!(line = record.line_number, "rule conforms");
                RuleOutcome::Conforming
            }
            Ok(rows) => {
                tracing::warn!(
                    line = record.line_number,
                    child = %query.child_class,
                    parent = %query.parent_class,
                    anomalies = rows.len(),
                    "elements not contained as required"
                );
                self.log_preview(&rows);
                RuleOutcome::Anomalous { rows }
            }
            Err(err) => {
                tracing::warn!(
                    line = record.line_number,
                    error = %err,
                    "rule query failed"
                );
                RuleOutcome::ExecutionFailed {
                    message: err.to_string(),
                }
            }
        }
    }

    fn log_preview(&self, rows: &[Row]) {
        let limit = self.config.preview_limit;
        for row in rows.iter().take(limit) {
            let label = match row.get(ANOMALOUS_ELEMENT_COLUMN) {
                Some(Value::String(label)) => label.as_str(),
                _ => "-",
            };
            tracing::info!(
                element = label,
                id = %extract_identifier(row, ID_COLUMN),
                "anomalous element"
            );
        }
        if rows.len() > limit {
            tracing::info!("… and {} more", rows.len() - limit);
        }
    }

    /// Audit every eligible line of `source` and write the anomaly artifact.
    pub fn run(&self, source: &str) -> Result<AuditRun, AuditError> {
        let records = eligible_rules(source);
        let mut report = ConformanceReport {
            eligible_rules: records.len(),
            ..ConformanceReport::default()
        };
        let mut anomalies = AnomalySet::new();
        let mut rules = Vec::with_capacity(records.len());

        for record in records {
            let outcome = self.audit_rule(&record);
            match &outcome {
                RuleOutcome::Conforming => report.audited_rules += 1,
                RuleOutcome::Anomalous { rows } => {
                    report.audited_rules += 1;
                    report.anomalous_rules += 1;
                    anomalies.extend(rows.iter().map(|row| extract_identifier(row, ID_COLUMN)));
                }
                RuleOutcome::TranslationFailed { .. } => report.translation_failures += 1,
                RuleOutcome::ExecutionFailed { .. } => report.execution_failures += 1,
            }
            rules.push(RuleAudit {
                line_number: record.line_number,
                text: record.text,
                outcome,
            });
        }

        let artifact = if anomalies.write_artifact(&self.config.anomaly_artifact)? {
            tracing::info!(
                path = %self.config.anomaly_artifact.display(),
                count = anomalies.len(),
                "wrote anomaly artifact"
            );
            Some(self.config.anomaly_artifact.clone())
        } else {
            None
        };

        match report.conformance_rate() {
            Some(rate) => tracing::info!(
                audited = report.audited_rules,
                anomalous = report.anomalous_rules,
                "conformance {rate:.1}%"
            ),
            None => tracing::info!(eligible = report.eligible_rules, "no rules audited"),
        }

        Ok(AuditRun {
            report,
            anomalies,
            rules,
            artifact,
        })
    }
}

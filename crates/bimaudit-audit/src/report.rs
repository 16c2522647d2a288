use std::fmt;

use serde::{Deserialize, Serialize};

/// Counters for one audit run.
///
/// `audited_rules` is the conformance denominator: eligible rules minus the
/// ones that failed to translate or execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConformanceReport {
    pub eligible_rules: usize,
    pub audited_rules: usize,
    pub anomalous_rules: usize,
    pub translation_failures: usize,
    pub execution_failures: usize,
}

impl ConformanceReport {
    pub fn conforming_rules(&self) -> usize {
        self.audited_rules.saturating_sub(self.anomalous_rules)
    }

    /// Percentage of audited rules with no anomalies; `None` when nothing was audited.
    pub fn conformance_rate(&self) -> Option<f64> {
        if self.audited_rules == 0 {
            None
        } else {
            Some(self.conforming_rules() as f64 / self.audited_rules as f64 * 100.0)
        }
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.eligible_rules == 0 {
            return writeln!(f, "no valid rules found in the rule source");
        }
        writeln!(f, "eligible rules:       {}", self.eligible_rules)?;
        writeln!(f, "audited rules:        {}", self.audited_rules)?;
        writeln!(f, "conforming rules:     {}", self.conforming_rules())?;
        writeln!(f, "rules with anomalies: {}", self.anomalous_rules)?;
        writeln!(f, "translation failures: {}", self.translation_failures)?;
        writeln!(f, "execution failures:   {}", self.execution_failures)?;
        match self.conformance_rate() {
            Some(rate) => writeln!(f, "conformance rate:     {rate:.1}%"),
            None => writeln!(f, "conformance rate:     n/a (no rules audited)"),
        }
    }
}

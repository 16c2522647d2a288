//! `bimaudit check-grammar`: grammar self-test.
//!
//! Parses a fixed set of sample rules and then every eligible line of a rule
//! file, printing each parse tree (or the parse error). With `--export` the
//! rule-file trees are also written next to the rule file as
//! `<stem>_tree.txt`.

use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bimaudit_audit::eligible_rules;
use bimaudit_dsl::Grammar;
use colored::Colorize;

/// Rules every shipped grammar must accept.
pub const SAMPLE_RULES: &[&str] = &[
    "VERIFY WALL CONTAINED_IN FLOOR",
    "VERIFY BEAM CONTAINED_IN FLOOR",
    "VERIFY COLUMN CONTAINED_IN FLOOR",
    "VERIFY SLAB CONTAINED_IN FLOOR",
    "VERIFY DOOR CONTAINED_IN WALL",
    "VERIFY WINDOW CONTAINED_IN WALL",
    "VERIFY FLOOR CONTAINED_IN BUILDING",
    "VERIFY SPACE CONTAINED_IN FLOOR",
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GrammarCheckSummary {
    pub samples_ok: usize,
    pub samples_failed: usize,
    pub rules_ok: usize,
    pub rules_failed: usize,
    pub export: Option<PathBuf>,
}

impl GrammarCheckSummary {
    pub fn failed(&self) -> usize {
        self.samples_failed + self.rules_failed
    }
}

/// Output path for `--export`: `rules.txt` → `rules_tree.txt`.
pub fn export_path(rules: &Path) -> PathBuf {
    let stem = rules
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rules".to_string());
    rules.with_file_name(format!("{stem}_tree.txt"))
}

pub fn check_grammar(
    grammar: &Grammar,
    rules: Option<&Path>,
    export: bool,
    out: &mut impl Write,
) -> Result<GrammarCheckSummary> {
    let mut summary = GrammarCheckSummary::default();

    writeln!(
        out,
        "{} grammar defines {} productions",
        "ok".green().bold(),
        grammar.rule_names().len()
    )?;

    writeln!(out, "\n{}", "Sample rules".bold())?;
    for sample in SAMPLE_RULES {
        if check_line(grammar, sample, out, None)? {
            summary.samples_ok += 1;
        } else {
            summary.samples_failed += 1;
        }
    }

    let Some(rules) = rules else {
        return Ok(summary);
    };

    let text = std::fs::read_to_string(rules)
        .with_context(|| format!("failed to read rule file {}", rules.display()))?;
    writeln!(out, "\n{} {}", "Rule file".bold(), rules.display())?;

    let mut exported = String::new();
    for record in eligible_rules(&text) {
        write!(out, "line {}: ", record.line_number)?;
        let sink = if export {
            writeln!(exported, "# line {}: {}", record.line_number, record.text)?;
            Some(&mut exported)
        } else {
            None
        };
        if check_line(grammar, &record.text, out, sink)? {
            summary.rules_ok += 1;
        } else {
            summary.rules_failed += 1;
        }
    }

    if export {
        let path = export_path(rules);
        std::fs::write(&path, &exported)
            .with_context(|| format!("failed to write {}", path.display()))?;
        writeln!(out, "\n{} {}", "→".cyan(), path.display())?;
        summary.export = Some(path);
    }

    Ok(summary)
}

fn check_line(
    grammar: &Grammar,
    line: &str,
    out: &mut impl Write,
    export: Option<&mut String>,
) -> Result<bool> {
    writeln!(out, "{}", line)?;
    let tree = grammar.parse_tree(line).map_err(|e| e.to_string()).and_then(|tree| {
        grammar
            .parse(line)
            .map(|_| tree)
            .map_err(|e| e.to_string())
    });
    match tree {
        Ok(tree) => {
            let pretty = tree.pretty();
            write!(out, "{pretty}")?;
            if let Some(sink) = export {
                sink.push_str(&pretty);
            }
            Ok(true)
        }
        Err(message) => {
            writeln!(out, "  {} {}", "error:".red().bold(), message)?;
            if let Some(sink) = export {
                writeln!(sink, "error: {message}")?;
            }
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimaudit_dsl::default_grammar;

    #[test]
    fn samples_parse_with_bundled_grammar() {
        let grammar = default_grammar().unwrap();
        let mut out = Vec::new();
        let summary = check_grammar(&grammar, None, false, &mut out).unwrap();
        assert_eq!(summary.samples_ok, SAMPLE_RULES.len());
        assert_eq!(summary.failed(), 0);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("type_token\tWINDOW"), "{text}");
    }

    #[test]
    fn exports_trees_next_to_rule_file() {
        let dir = tempfile::tempdir().unwrap();
        let rules = dir.path().join("rules.txt");
        std::fs::write(
            &rules,
            "// c\nVERIFY WALL CONTAINED_IN FLOOR\nVERIFY WALL INSIDE FLOOR\n",
        )
        .unwrap();

        let grammar = default_grammar().unwrap();
        let mut out = Vec::new();
        let summary = check_grammar(&grammar, Some(&rules), true, &mut out).unwrap();
        assert_eq!(summary.rules_ok, 1);
        assert_eq!(summary.rules_failed, 1);

        let exported = dir.path().join("rules_tree.txt");
        assert_eq!(summary.export.as_deref(), Some(exported.as_path()));
        let text = std::fs::read_to_string(exported).unwrap();
        assert!(text.contains("# line 2: VERIFY WALL CONTAINED_IN FLOOR"), "{text}");
        assert!(text.contains("error: unexpected `INSIDE`"), "{text}");
    }
}

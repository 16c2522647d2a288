//! bimaudit CLI
//!
//! Command-line interface for:
//! - Auditing a building graph snapshot against a containment rule file
//! - Compiling a single rule to its graph query
//! - Self-testing a rule grammar
//! - Listing the type vocabulary

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use bimaudit_audit::{AuditConfig, AuditRun, Auditor, RuleOutcome};
use bimaudit_dsl::compiler::{ANOMALOUS_ELEMENT_COLUMN, ID_COLUMN};
use bimaudit_dsl::{compile, default_grammar, load_grammar, Grammar, TypeVocabulary};
use bimaudit_graph::MemoryStore;

mod grammar_check;

#[derive(Parser)]
#[command(name = "bimaudit")]
#[command(
    author,
    version,
    about = "bimaudit: containment-rule auditor for building property graphs"
)]
struct Cli {
    /// More log output (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a graph snapshot against a rule file.
    ///
    /// Every eligible line of the rule file is parsed, compiled to a
    /// containment query and run against the graph. Anomalous element ids
    /// are written to the anomaly artifact when there are any.
    Audit {
        /// Graph snapshot (JSON)
        #[arg(long)]
        graph: PathBuf,
        /// Rule file, one rule per line
        #[arg(long, default_value = "rules.txt")]
        rules: PathBuf,
        /// Rule grammar (pest); the bundled grammar when omitted
        #[arg(long)]
        grammar: Option<PathBuf>,
        /// Audit configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Anomaly artifact path (overrides the config file)
        #[arg(long)]
        anomalies: Option<PathBuf>,
        /// Anomalies shown per rule (overrides the config file)
        #[arg(long)]
        preview: Option<usize>,
        /// Print the run as JSON instead of the human report
        #[arg(long)]
        json: bool,
    },

    /// Parse and compile one rule, printing the resulting query.
    Compile {
        /// Rule text, e.g. "VERIFY WALL CONTAINED_IN FLOOR"
        rule: String,
        #[arg(long)]
        grammar: Option<PathBuf>,
    },

    /// Check a grammar against sample rules and (optionally) a rule file.
    CheckGrammar {
        #[arg(long)]
        grammar: Option<PathBuf>,
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Write the rule-file parse trees to `<rules>_tree.txt`
        #[arg(long, requires = "rules")]
        export: bool,
    },

    /// Print the type vocabulary.
    Vocab,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Audit {
            graph,
            rules,
            grammar,
            config,
            anomalies,
            preview,
            json,
        } => {
            let mut cfg = match &config {
                Some(path) => AuditConfig::from_json_file(path)?,
                None => AuditConfig::default(),
            };
            if let Some(path) = anomalies {
                cfg.anomaly_artifact = path;
            }
            if let Some(limit) = preview {
                cfg.preview_limit = limit;
            }
            cmd_audit(&graph, &rules, grammar.as_deref(), cfg, json)
        }
        Commands::Compile { rule, grammar } => cmd_compile(&rule, grammar.as_deref()),
        Commands::CheckGrammar {
            grammar,
            rules,
            export,
        } => cmd_check_grammar(grammar.as_deref(), rules.as_deref(), export),
        Commands::Vocab => cmd_vocab(),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn grammar_from(path: Option<&Path>) -> Result<Grammar> {
    let grammar = match path {
        Some(path) => load_grammar(path)?,
        None => default_grammar()?,
    };
    Ok(grammar)
}

// ============================================================================
// audit
// ============================================================================

fn cmd_audit(
    graph: &Path,
    rules: &Path,
    grammar: Option<&Path>,
    config: AuditConfig,
    json: bool,
) -> Result<()> {
    let store = MemoryStore::from_snapshot_file(graph)
        .with_context(|| format!("failed to load graph snapshot {}", graph.display()))?;
    let source = bimaudit_audit::read_rule_file(rules)?;

    if !json {
        println!(
            "{} {} against {} ({} nodes, {} edges)",
            "Auditing".green().bold(),
            rules.display(),
            graph.display(),
            store.graph().node_count(),
            store.graph().edge_count()
        );
    }

    let preview_limit = config.preview_limit;
    let auditor = Auditor::open(config, store, grammar, TypeVocabulary::ifc())?;
    let run = auditor.run(&source)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_run(&run, preview_limit);
    }
    Ok(())
}

fn print_run(run: &AuditRun, preview_limit: usize) {
    for rule in &run.rules {
        let line = format!("line {:>3}", rule.line_number);
        match &rule.outcome {
            RuleOutcome::Conforming => {
                println!("  {} {} {}", "✓".green(), line.dimmed(), rule.text);
            }
            RuleOutcome::Anomalous { rows } => {
                println!(
                    "  {} {} {} ({} anomalies)",
                    "✗".red().bold(),
                    line.dimmed(),
                    rule.text,
                    rows.len()
                );
                for row in rows.iter().take(preview_limit) {
                    println!(
                        "      {} {} [{}]",
                        "→".yellow(),
                        column_text(row.get(ANOMALOUS_ELEMENT_COLUMN)),
                        bimaudit_audit::extract_identifier(row, ID_COLUMN)
                    );
                }
                if rows.len() > preview_limit {
                    println!("      … and {} more", rows.len() - preview_limit);
                }
            }
            RuleOutcome::TranslationFailed { message } => {
                println!(
                    "  {} {} {}: {}",
                    "!".yellow().bold(),
                    line.dimmed(),
                    rule.text,
                    message
                );
            }
            RuleOutcome::ExecutionFailed { message } => {
                println!(
                    "  {} {} {}: {}",
                    "!".red(),
                    line.dimmed(),
                    rule.text,
                    message
                );
            }
        }
    }

    println!();
    print!("{}", run.report);
    match &run.artifact {
        Some(path) => println!(
            "{} {} ({} unique ids)",
            "→".cyan(),
            path.display(),
            run.anomalies.len()
        ),
        None if run.report.eligible_rules > 0 => println!("{}", "no anomalies recorded".green()),
        None => {}
    }
}

fn column_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

// ============================================================================
// compile / check-grammar / vocab
// ============================================================================

fn cmd_compile(rule: &str, grammar: Option<&Path>) -> Result<()> {
    let grammar = grammar_from(grammar)?;
    let ast = grammar
        .parse(rule)
        .with_context(|| format!("cannot parse `{rule}`"))?;
    let query = compile(&ast, &TypeVocabulary::ifc())
        .with_context(|| format!("cannot compile `{rule}`"))?;

    println!("{} {}", "ok".green().bold(), ast);
    println!("  child:    {}", query.child_class);
    println!("  parent:   {}", query.parent_class);
    println!("  relation: {}", query.relation);
    println!();
    println!("{}", query.text);
    Ok(())
}

fn cmd_check_grammar(grammar: Option<&Path>, rules: Option<&Path>, export: bool) -> Result<()> {
    let grammar = grammar_from(grammar)?;
    let summary = {
        let mut stdout = std::io::stdout().lock();
        grammar_check::check_grammar(&grammar, rules, export, &mut stdout)?
    };
    println!(
        "\n{} samples: {} ok, {} failed; rule file: {} ok, {} failed",
        "Summary".bold(),
        summary.samples_ok,
        summary.samples_failed,
        summary.rules_ok,
        summary.rules_failed
    );
    if summary.failed() > 0 {
        anyhow::bail!("{} rule(s) failed to parse", summary.failed());
    }
    Ok(())
}

fn cmd_vocab() -> Result<()> {
    let vocabulary = TypeVocabulary::ifc();
    for entry in vocabulary.entries() {
        println!("{:<10} {}", entry.token, entry.class);
    }
    Ok(())
}

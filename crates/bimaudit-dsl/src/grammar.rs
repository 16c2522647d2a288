//! Runtime rule grammar.
//!
//! The rule language is described by a PEG grammar (pest syntax) that is read
//! and compiled once at startup. Each rule line is then run through the
//! compiled grammar and destructured into a [`RuleAst`].
//!
//! A grammar is accepted only if it defines the productions the destructuring
//! step relies on (see [`REQUIRED_RULES`]). Anything the grammar accepts must
//! still reduce to exactly one `containment` node with one `child`, one
//! `parent` and one `contained_in_kw`; other shapes are parse errors.

use std::fmt;
use std::path::{Path, PathBuf};

use pest::error::{ErrorVariant, InputLocation};
use pest::iterators::Pair;
use pest_vm::Vm;
use thiserror::Error;

use crate::ast::{ClauseRole, ParseTree, RuleAst, TypeClause};

/// Grammar shipped with the crate.
pub const DEFAULT_GRAMMAR: &str = include_str!("../grammar/containment.pest");

/// Entry production.
pub const START_RULE: &str = "rule";

/// Productions the destructuring step depends on.
pub const REQUIRED_RULES: &[&str] = &[
    START_RULE,
    "containment",
    "child",
    "parent",
    "type_token",
    "contained_in_kw",
];

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("failed to read grammar `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid grammar:\n{}", .messages.join("\n"))]
    Invalid { messages: Vec<String> },
    #[error("grammar is missing required production `{0}`")]
    MissingRule(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected {found} at column {column}{}", format_expected(.expected))]
    Unexpected {
        found: String,
        column: usize,
        expected: Vec<String>,
    },
    #[error("rule has the wrong shape: {0}")]
    Shape(String),
}

impl ParseError {
    /// The offending token, when the failure points at one.
    pub fn found(&self) -> Option<&str> {
        match self {
            ParseError::Unexpected { found, .. } => Some(found),
            ParseError::Shape(_) => None,
        }
    }
}

fn format_expected(expected: &[String]) -> String {
    if expected.is_empty() {
        String::new()
    } else {
        format!(" (expected one of: {})", expected.join(", "))
    }
}

/// A compiled rule grammar. Immutable; parsing keeps no state between calls.
pub struct Grammar {
    vm: Vm,
    rules: Vec<String>,
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar").field("rules", &self.rules).finish()
    }
}

/// Compile a grammar definition.
pub fn compile_grammar(source: &str) -> Result<Grammar, GrammarError> {
    let (_, optimized) =
        pest_meta::parse_and_optimize(source).map_err(|errors| GrammarError::Invalid {
            messages: errors.iter().map(|e| e.to_string()).collect(),
        })?;

    let rules: Vec<String> = optimized.iter().map(|r| r.name.clone()).collect();
    for required in REQUIRED_RULES {
        if !rules.iter().any(|r| r == required) {
            return Err(GrammarError::MissingRule(required.to_string()));
        }
    }

    Ok(Grammar {
        vm: Vm::new(optimized),
        rules,
    })
}

/// Read and compile a grammar file.
pub fn load_grammar(path: &Path) -> Result<Grammar, GrammarError> {
    let source = std::fs::read_to_string(path).map_err(|source| GrammarError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    compile_grammar(&source)
}

/// The bundled grammar.
pub fn default_grammar() -> Result<Grammar, GrammarError> {
    compile_grammar(DEFAULT_GRAMMAR)
}

impl Grammar {
    /// Production names defined by the grammar, in definition order.
    pub fn rule_names(&self) -> &[String] {
        &self.rules
    }

    /// Run the grammar over `line` and return the untyped tree.
    pub fn parse_tree(&self, line: &str) -> Result<ParseTree, ParseError> {
        let mut pairs = self
            .vm
            .parse(START_RULE, line)
            .map_err(|err| unexpected(line, err))?;
        let Some(root) = pairs.next() else {
            return Err(ParseError::Shape("grammar produced no tree".to_string()));
        };
        if pairs.next().is_some() {
            return Err(ParseError::Shape(
                "grammar produced more than one top-level tree".to_string(),
            ));
        }
        Ok(to_tree(root))
    }

    /// Parse one rule line.
    pub fn parse(&self, line: &str) -> Result<RuleAst, ParseError> {
        let tree = self.parse_tree(line)?;
        destructure(&tree)
    }
}

fn to_tree(pair: Pair<'_, &str>) -> ParseTree {
    let span = pair.as_span();
    ParseTree {
        rule: pair.as_rule().to_string(),
        text: pair.as_str().to_string(),
        start: span.start(),
        end: span.end(),
        children: pair.into_inner().map(to_tree).collect(),
    }
}

fn unexpected(line: &str, err: pest::error::Error<&str>) -> ParseError {
    let pos = match err.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    };
    let expected = match &err.variant {
        ErrorVariant::ParsingError { positives, .. } => {
            let mut names: Vec<String> = positives.iter().map(|r| r.to_string()).collect();
            names.sort();
            names.dedup();
            names
        }
        ErrorVariant::CustomError { .. } => Vec::new(),
    };
    ParseError::Unexpected {
        found: token_at(line, pos),
        column: line.get(..pos).map_or(pos, |prefix| prefix.chars().count()) + 1,
        expected,
    }
}

fn token_at(line: &str, pos: usize) -> String {
    let rest = line.get(pos..).unwrap_or("");
    let token: String = rest.chars().take_while(|c| !c.is_whitespace()).collect();
    if token.is_empty() {
        if rest.is_empty() {
            "end of input".to_string()
        } else {
            "whitespace".to_string()
        }
    } else {
        format!("`{token}`")
    }
}

fn exactly_one<'a>(node: &'a ParseTree, rule: &str) -> Result<&'a ParseTree, ParseError> {
    let mut matches = node.children_named(rule);
    match (matches.next(), matches.next()) {
        (Some(found), None) => Ok(found),
        (None, _) => Err(ParseError::Shape(format!(
            "`{}` has no `{rule}` clause",
            node.rule
        ))),
        (Some(_), Some(_)) => Err(ParseError::Shape(format!(
            "`{}` has more than one `{rule}` clause",
            node.rule
        ))),
    }
}

fn type_clause(node: &ParseTree, role: ClauseRole) -> Result<TypeClause, ParseError> {
    let clause = exactly_one(node, &role.to_string())?;
    let token = exactly_one(clause, "type_token")?;
    Ok(TypeClause {
        token: token.text.clone(),
        start: token.start,
        end: token.end,
    })
}

fn destructure(tree: &ParseTree) -> Result<RuleAst, ParseError> {
    if tree.rule != START_RULE {
        return Err(ParseError::Shape(format!(
            "expected `{START_RULE}` at the root, found `{}`",
            tree.rule
        )));
    }
    let containment = exactly_one(tree, "containment")?;
    exactly_one(containment, "contained_in_kw")?;
    Ok(RuleAst {
        child: type_clause(containment, ClauseRole::Child)?,
        parent: type_clause(containment, ClauseRole::Parent)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar() -> Grammar {
        default_grammar().expect("bundled grammar compiles")
    }

    #[test]
    fn parses_canonical_rule() {
        let ast = grammar().parse("VERIFY WALL CONTAINED_IN FLOOR").expect("parse");
        assert_eq!(ast.child.token, "WALL");
        assert_eq!(ast.parent.token, "FLOOR");
        assert_eq!((ast.child.start, ast.child.end), (7, 11));
    }

    #[test]
    fn tolerates_extra_spaces_and_tabs() {
        let ast = grammar()
            .parse("  VERIFY\tdoor   CONTAINED_IN  Wall ")
            .expect("parse");
        assert_eq!(ast.child.token, "door");
        assert_eq!(ast.parent.token, "Wall");
    }

    #[test]
    fn keeps_child_and_parent_roles_apart() {
        let g = grammar();
        let a = g.parse("VERIFY WALL CONTAINED_IN FLOOR").expect("parse");
        let b = g.parse("VERIFY FLOOR CONTAINED_IN WALL").expect("parse");
        assert_eq!(a.child.token, b.parent.token);
        assert_eq!(a.parent.token, b.child.token);
    }

    #[test]
    fn rejects_missing_parent_with_expected_set() {
        let err = grammar().parse("VERIFY WALL CONTAINED_IN").expect_err("should fail");
        match err {
            ParseError::Unexpected {
                found, expected, ..
            } => {
                assert_eq!(found, "end of input");
                assert!(expected.contains(&"type_token".to_string()), "{expected:?}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_keyword_and_reports_token() {
        let err = grammar().parse("VERIFY WALL INSIDE FLOOR").expect_err("should fail");
        assert_eq!(err.found(), Some("`INSIDE`"));
        assert!(err.to_string().contains("contained_in_kw"), "{err}");
    }

    #[test]
    fn rejects_trailing_tokens() {
        assert!(grammar()
            .parse("VERIFY WALL CONTAINED_IN FLOOR EXTRA")
            .is_err());
    }

    #[test]
    fn keyword_is_not_a_type_token() {
        let err = grammar()
            .parse("VERIFY CONTAINED_IN FLOOR")
            .expect_err("keyword in child position");
        assert_eq!(err.found(), Some("`CONTAINED_IN`"));
    }

    #[test]
    fn keyword_must_be_a_whole_word() {
        assert!(grammar().parse("VERIFYWALL CONTAINED_IN FLOOR").is_err());
    }

    #[test]
    fn parsing_is_deterministic() {
        let g = grammar();
        assert_eq!(g.parse("VERIFY A CONTAINED_IN B"), g.parse("VERIFY A CONTAINED_IN B"));
        assert_eq!(g.parse("VERIFY A B"), g.parse("VERIFY A B"));
    }

    #[test]
    fn malformed_grammar_is_rejected() {
        let err = compile_grammar("rule = { SOI ~ ").expect_err("should fail");
        assert!(matches!(err, GrammarError::Invalid { .. }), "{err:?}");
    }

    #[test]
    fn grammar_without_role_productions_is_rejected() {
        let err = compile_grammar(
            r#"
            WHITESPACE = _{ " " }
            rule = { SOI ~ containment ~ EOI }
            containment = { "VERIFY" ~ type_token ~ contained_in_kw ~ type_token }
            contained_in_kw = { "CONTAINED_IN" }
            type_token = @{ ASCII_ALPHA+ }
            "#,
        )
        .expect_err("should fail");
        assert!(matches!(err, GrammarError::MissingRule(ref r) if r == "child"), "{err:?}");
    }

    #[test]
    fn parse_tree_exposes_productions() {
        let tree = grammar()
            .parse_tree("VERIFY DOOR CONTAINED_IN WALL")
            .expect("parse");
        let pretty = tree.pretty();
        assert!(pretty.starts_with("rule\n  containment\n"), "{pretty}");
        assert!(pretty.contains("type_token\tDOOR"), "{pretty}");
    }
}

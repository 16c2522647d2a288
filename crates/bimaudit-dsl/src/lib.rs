//! Containment rule language for building-model audits.
//!
//! ```text
//! VERIFY WALL CONTAINED_IN FLOOR
//! ```
//!
//! A rule line goes through three stages:
//! - [`grammar`]: the runtime PEG grammar parses the line into a [`ast::RuleAst`],
//! - [`vocabulary`]: each type token is resolved to a graph schema class,
//! - [`compiler`]: the resolved rule is rendered as a containment-existence query.
//!
//! The crate does not talk to a graph store; it only produces query text and
//! the structural descriptor the audit engine uses to label results.

pub mod ast;
pub mod compiler;
pub mod grammar;
pub mod vocabulary;

pub use ast::{ClauseRole, ParseTree, RuleAst, TypeClause};
pub use compiler::{compile, CompileError, CompiledQuery, CONTAINMENT_RELATION};
pub use grammar::{
    compile_grammar, default_grammar, load_grammar, Grammar, GrammarError, ParseError,
    DEFAULT_GRAMMAR,
};
pub use vocabulary::{TypeVocabulary, VocabularyEntry, VocabularyError};

//! Rule compiler: [`RuleAst`] → [`CompiledQuery`].
//!
//! A containment rule `VERIFY C CONTAINED_IN P` compiles to a one-hop
//! negative-existence pattern: every node labelled `class(C)` with **no**
//! outgoing `isContainedIn` edge to a node labelled `class(P)`.
//!
//! The query is kept structural ([`CompiledQuery`] fields) and rendered to
//! text in one place ([`render_query`]). Only vocabulary-resolved class names
//! reach the renderer, and every identifier/literal is quoted on the way out.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::{ClauseRole, RuleAst};
use crate::vocabulary::TypeVocabulary;

/// Relation type of containment edges in the building graph.
pub const CONTAINMENT_RELATION: &str = "isContainedIn";

/// Node variable bound to the element under audit.
pub const ELEMENT_VAR: &str = "child";

/// Node attribute holding an element's human-readable label.
pub const LABEL_ATTR: &str = "label";
/// Node attribute holding an element's identifier.
pub const ID_ATTR: &str = "uri";

/// Result columns every compiled query returns.
pub const ANOMALOUS_ELEMENT_COLUMN: &str = "anomalous_element";
pub const ID_COLUMN: &str = "id";
pub const TYPE_COLUMN: &str = "type";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("unknown {role} type `{token}`")]
    UnknownType { token: String, role: ClauseRole },
}

impl CompileError {
    pub fn token(&self) -> &str {
        match self {
            CompileError::UnknownType { token, .. } => token,
        }
    }
}

/// A containment rule ready for the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub child_class: String,
    pub parent_class: String,
    pub relation: String,
    pub text: String,
}

/// Resolve both type clauses and render the containment-existence query.
pub fn compile(ast: &RuleAst, vocabulary: &TypeVocabulary) -> Result<CompiledQuery, CompileError> {
    let child_class = resolve(ast, ClauseRole::Child, vocabulary)?;
    let parent_class = resolve(ast, ClauseRole::Parent, vocabulary)?;
    let text = render_query(child_class, CONTAINMENT_RELATION, parent_class);

    Ok(CompiledQuery {
        child_class: child_class.to_string(),
        parent_class: parent_class.to_string(),
        relation: CONTAINMENT_RELATION.to_string(),
        text,
    })
}

fn resolve<'v>(
    ast: &RuleAst,
    role: ClauseRole,
    vocabulary: &'v TypeVocabulary,
) -> Result<&'v str, CompileError> {
    let token = &ast.clause(role).token;
    vocabulary
        .resolve(token)
        .ok_or_else(|| CompileError::UnknownType {
            token: token.to_ascii_uppercase(),
            role,
        })
}

/// Render the negative-existence containment pattern.
pub fn render_query(child_class: &str, relation: &str, parent_class: &str) -> String {
    let var = ELEMENT_VAR;
    format!(
        "MATCH ({var}:{child})\n\
         WHERE NOT ({var})-[:{rel}]->(:{parent})\n\
         RETURN {var}.{label} AS {c_label}, {var}.{id} AS {c_id}, {lit} AS {c_type}",
        child = quote_ident(child_class),
        rel = quote_ident(relation),
        parent = quote_ident(parent_class),
        label = LABEL_ATTR,
        id = ID_ATTR,
        lit = quote_str(child_class),
        c_label = ANOMALOUS_ELEMENT_COLUMN,
        c_id = ID_COLUMN,
        c_type = TYPE_COLUMN,
    )
}

/// Backtick-quote an identifier (embedded backticks are doubled).
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Single-quote a string literal (`\` and `'` are backslash-escaped).
pub fn quote_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\\' || ch == '\'' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

//! Typed syntax tree for containment rules, plus the untyped parse tree the
//! grammar produces before it is destructured.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which side of a containment assertion a type clause sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseRole {
    Child,
    Parent,
}

impl fmt::Display for ClauseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseRole::Child => write!(f, "child"),
            ClauseRole::Parent => write!(f, "parent"),
        }
    }
}

/// A type token as written in the rule, with its byte span in the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeClause {
    pub token: String,
    pub start: usize,
    pub end: usize,
}

/// `VERIFY <child> CONTAINED_IN <parent>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAst {
    pub child: TypeClause,
    pub parent: TypeClause,
}

impl RuleAst {
    pub fn clause(&self, role: ClauseRole) -> &TypeClause {
        match role {
            ClauseRole::Child => &self.child,
            ClauseRole::Parent => &self.parent,
        }
    }
}

impl fmt::Display for RuleAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VERIFY {} CONTAINED_IN {}",
            self.child.token, self.parent.token
        )
    }
}

/// Grammar-agnostic parse tree: one node per non-silent production.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseTree {
    pub rule: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub children: Vec<ParseTree>,
}

impl ParseTree {
    /// Children produced by `rule`.
    ///
    /// The returned nodes borrow from the tree only, so they outlive a
    /// temporary `rule` name.
    pub fn children_named<'a, 'r>(
        &'a self,
        rule: &'r str,
    ) -> impl Iterator<Item = &'a ParseTree> + 'r
    where
        'a: 'r,
    {
        self.children.iter().filter(move |c| c.rule == rule)
    }

    /// Indented rendering, leaves shown with their matched text.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out
    }

    fn write_pretty(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        if self.children.is_empty() {
            out.push_str(&format!("{}\t{}\n", self.rule, self.text));
            return;
        }
        out.push_str(&self.rule);
        out.push('\n');
        for child in &self.children {
            child.write_pretty(out, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(rule: &str, text: &str) -> ParseTree {
        ParseTree {
            rule: rule.to_string(),
            text: text.to_string(),
            start: 0,
            end: text.len(),
            children: vec![],
        }
    }

    #[test]
    fn pretty_indents_by_depth() {
        let tree = ParseTree {
            rule: "child".to_string(),
            text: "WALL".to_string(),
            start: 0,
            end: 4,
            children: vec![leaf("type_token", "WALL")],
        };
        assert_eq!(tree.pretty(), "child\n  type_token\tWALL\n");
    }

    #[test]
    fn children_named_outlive_temporary_rule_name() {
        let tree = ParseTree {
            rule: "rule".to_string(),
            text: "VERIFY WALL CONTAINED_IN FLOOR".to_string(),
            start: 0,
            end: 30,
            children: vec![leaf("child", "WALL"), leaf("parent", "FLOOR")],
        };

        let found: Option<&ParseTree> = {
            let name = ClauseRole::Parent.to_string();
            let mut matches = tree.children_named(&name);
            matches.next()
        };
        assert_eq!(found.map(|c| c.text.as_str()), Some("FLOOR"));
        assert_eq!(tree.children_named("type_token").count(), 0);
    }

    #[test]
    fn display_uses_surface_syntax() {
        let ast = RuleAst {
            child: TypeClause {
                token: "DOOR".to_string(),
                start: 7,
                end: 11,
            },
            parent: TypeClause {
                token: "WALL".to_string(),
                start: 25,
                end: 29,
            },
        };
        assert_eq!(ast.to_string(), "VERIFY DOOR CONTAINED_IN WALL");
        assert_eq!(ast.clause(ClauseRole::Parent).token, "WALL");
    }
}

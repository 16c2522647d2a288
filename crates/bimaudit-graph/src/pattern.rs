//! Containment-existence patterns.
//!
//! [`MemoryStore`](crate::MemoryStore) answers exactly one query shape, the one
//! the rule compiler renders:
//!
//! ```text
//! MATCH (child:`IfcWall`)
//! WHERE NOT (child)-[:`isContainedIn`]->(:`IfcBuildingStorey`)
//! RETURN child.label AS anomalous_element, child.uri AS id, 'IfcWall' AS type
//! ```
//!
//! Keywords are case-insensitive, identifiers may be bare or backtick-quoted,
//! the `WHERE NOT` clause is optional, and `RETURN` takes any number of
//! `var.attr AS alias` / `'literal' AS alias` items. Everything else is
//! rejected; this is not a general query language.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char as pchar, multispace0, satisfy},
    combinator::{all_consuming, map, not, opt, recognize},
    error::{Error as NomError, ErrorKind},
    multi::separated_list1,
    sequence::{delimited, terminated, tuple},
    IResult,
};
use serde_json::Value;
use thiserror::Error;

use crate::store::Row;
use crate::PropertyGraph;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("unsupported query (expected a containment pattern) near `{0}`")]
    Syntax(String),
    #[error("variable `{found}` is not bound (MATCH binds `{bound}`)")]
    UnboundVariable { found: String, bound: String },
}

/// `WHERE NOT (var)-[:relation]->(:target_class)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsentEdge {
    pub relation: String,
    pub target_class: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionValue {
    Attr(String),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub value: ProjectionValue,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainmentPattern {
    pub var: String,
    pub class: String,
    pub absent_edge: Option<AbsentEdge>,
    pub projections: Vec<Projection>,
}

impl ContainmentPattern {
    /// One row per matching node, in node-id order.
    pub fn evaluate(&self, graph: &PropertyGraph) -> Vec<Row> {
        let candidates = graph.nodes_with_class(&self.class);
        let targets = self
            .absent_edge
            .as_ref()
            .map(|edge| (edge.relation.as_str(), graph.nodes_with_class(&edge.target_class)));

        let mut rows = Vec::new();
        for id in candidates.iter() {
            if let Some((relation, targets)) = &targets {
                if !graph.targets(id, relation).is_disjoint(targets) {
                    continue;
                }
            }
            let row: Row = self
                .projections
                .iter()
                .map(|p| {
                    let value = match &p.value {
                        ProjectionValue::Attr(name) => graph
                            .attr(id, name)
                            .map_or(Value::Null, |v| Value::String(v.to_string())),
                        ProjectionValue::Literal(text) => Value::String(text.clone()),
                    };
                    (p.alias.clone(), value)
                })
                .collect();
            rows.push(row);
        }
        rows
    }
}

/// Parse query text into a [`ContainmentPattern`].
pub fn parse_pattern(text: &str) -> Result<ContainmentPattern, PatternError> {
    let (_, ((var, class), absent, items)) =
        all_consuming(ws(tuple((match_clause, opt(where_clause), return_clause))))(text)
            .map_err(|err| PatternError::Syntax(near(text, err)))?;

    let absent_edge = match absent {
        Some((edge_var, edge)) => {
            check_bound(&var, edge_var)?;
            Some(edge)
        }
        None => None,
    };

    let mut projections = Vec::with_capacity(items.len());
    for (item, alias) in items {
        let value = match item {
            Item::Attr(item_var, attr) => {
                check_bound(&var, item_var)?;
                ProjectionValue::Attr(attr)
            }
            Item::Literal(text) => ProjectionValue::Literal(text),
        };
        projections.push(Projection { value, alias });
    }

    Ok(ContainmentPattern {
        var: var.to_string(),
        class,
        absent_edge,
        projections,
    })
}

fn check_bound(bound: &str, found: &str) -> Result<(), PatternError> {
    if bound == found {
        Ok(())
    } else {
        Err(PatternError::UnboundVariable {
            found: found.to_string(),
            bound: bound.to_string(),
        })
    }
}

fn near(text: &str, err: nom::Err<NomError<&str>>) -> String {
    let rest = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.input,
        nom::Err::Incomplete(_) => "",
    };
    let rest = rest.trim_start();
    let snippet: String = rest.chars().take(24).collect();
    if snippet.is_empty() && !text.trim().is_empty() {
        "end of query".to_string()
    } else {
        snippet
    }
}

// ============================================================================
// Lexical pieces
// ============================================================================

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn kw<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(word), not(satisfy(is_ident_continue)))
}

fn ident(input: &str) -> IResult<&str, &str> {
    recognize(tuple((take_while1(is_ident_start), take_while(is_ident_continue))))(input)
}

/// `` `name` `` with doubled backticks as the escape.
fn quoted_ident(input: &str) -> IResult<&str, String> {
    let (mut rest, _) = pchar('`')(input)?;
    let mut out = String::new();
    loop {
        let Some(idx) = rest.find('`') else {
            return Err(nom::Err::Error(NomError::new(input, ErrorKind::Char)));
        };
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 1..];
        match rest.strip_prefix('`') {
            Some(after) => {
                out.push('`');
                rest = after;
            }
            None => return Ok((rest, out)),
        }
    }
}

fn name(input: &str) -> IResult<&str, String> {
    alt((quoted_ident, map(ident, str::to_string)))(input)
}

/// `'text'` with `\` escaping the next character.
fn string_literal(input: &str) -> IResult<&str, String> {
    let (rest, _) = pchar('\'')(input)?;
    let mut out = String::new();
    let mut escaped = false;
    for (idx, ch) in rest.char_indices() {
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '\'' => return Ok((&rest[idx + 1..], out)),
            _ => out.push(ch),
        }
    }
    Err(nom::Err::Error(NomError::new(input, ErrorKind::Char)))
}

// ============================================================================
// Clauses
// ============================================================================

/// `MATCH (var:Class)`
fn match_clause(input: &str) -> IResult<&str, (&str, String)> {
    let (input, _) = ws(kw("MATCH"))(input)?;
    let (input, _) = pchar('(')(input)?;
    let (input, var) = ws(ident)(input)?;
    let (input, _) = pchar(':')(input)?;
    let (input, class) = ws(name)(input)?;
    let (input, _) = pchar(')')(input)?;
    Ok((input, (var, class)))
}

/// `WHERE NOT (var)-[:rel]->(:Class)`
fn where_clause(input: &str) -> IResult<&str, (&str, AbsentEdge)> {
    let (input, _) = ws(kw("WHERE"))(input)?;
    let (input, _) = ws(kw("NOT"))(input)?;
    let (input, _) = pchar('(')(input)?;
    let (input, var) = ws(ident)(input)?;
    let (input, _) = pchar(')')(input)?;
    let (input, _) = ws(tag("-["))(input)?;
    let (input, _) = pchar(':')(input)?;
    let (input, relation) = ws(name)(input)?;
    let (input, _) = ws(tag("]->"))(input)?;
    let (input, _) = pchar('(')(input)?;
    let (input, _) = ws(pchar(':'))(input)?;
    let (input, target_class) = ws(name)(input)?;
    let (input, _) = pchar(')')(input)?;
    Ok((
        input,
        (
            var,
            AbsentEdge {
                relation,
                target_class,
            },
        ),
    ))
}

enum Item<'a> {
    Attr(&'a str, String),
    Literal(String),
}

fn attr_item(input: &str) -> IResult<&str, Item<'_>> {
    let (input, var) = ident(input)?;
    let (input, _) = pchar('.')(input)?;
    let (input, attr) = name(input)?;
    Ok((input, Item::Attr(var, attr)))
}

fn projection(input: &str) -> IResult<&str, (Item<'_>, String)> {
    let (input, item) = ws(alt((attr_item, map(string_literal, Item::Literal))))(input)?;
    let (input, _) = ws(kw("AS"))(input)?;
    let (input, alias) = ws(name)(input)?;
    Ok((input, (item, alias)))
}

/// `RETURN item AS alias, ...`
fn return_clause(input: &str) -> IResult<&str, Vec<(Item<'_>, String)>> {
    let (input, _) = ws(kw("RETURN"))(input)?;
    separated_list1(pchar(','), projection)(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALL_QUERY: &str = "MATCH (child:`IfcWall`)\n\
        WHERE NOT (child)-[:`isContainedIn`]->(:`IfcBuildingStorey`)\n\
        RETURN child.label AS anomalous_element, child.uri AS id, 'IfcWall' AS type";

    fn graph() -> PropertyGraph {
        let mut g = PropertyGraph::new();
        let storey = g.add_node("s1", "IfcBuildingStorey", vec![]).unwrap();
        let space = g.add_node("sp1", "IfcSpace", vec![]).unwrap();
        let contained = g
            .add_node("w1", "IfcWall", vec![("label", "W-1"), ("uri", "urn:elem:1")])
            .unwrap();
        let wrong_parent = g
            .add_node("w2", "IfcWall", vec![("label", "W-2"), ("uri", "urn:elem:2")])
            .unwrap();
        g.add_node("w3", "IfcWall", vec![("label", "W-3")]).unwrap();
        g.add_edge(contained, "isContainedIn", storey).unwrap();
        g.add_edge(wrong_parent, "isContainedIn", space).unwrap();
        g
    }

    #[test]
    fn parses_compiled_query_shape() {
        let p = parse_pattern(WALL_QUERY).expect("parse");
        assert_eq!(p.var, "child");
        assert_eq!(p.class, "IfcWall");
        assert_eq!(
            p.absent_edge,
            Some(AbsentEdge {
                relation: "isContainedIn".to_string(),
                target_class: "IfcBuildingStorey".to_string(),
            })
        );
        assert_eq!(p.projections.len(), 3);
        assert_eq!(
            p.projections[2],
            Projection {
                value: ProjectionValue::Literal("IfcWall".to_string()),
                alias: "type".to_string(),
            }
        );
    }

    #[test]
    fn evaluates_negative_existence() {
        let rows = parse_pattern(WALL_QUERY).unwrap().evaluate(&graph());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["anomalous_element"], Value::String("W-2".to_string()));
        assert_eq!(rows[0]["id"], Value::String("urn:elem:2".to_string()));
        assert_eq!(rows[1]["id"], Value::Null);
        assert_eq!(rows[1]["type"], Value::String("IfcWall".to_string()));
    }

    #[test]
    fn unknown_class_matches_nothing() {
        let rows = parse_pattern("MATCH (n:IfcDoor) RETURN n.uri AS id")
            .unwrap()
            .evaluate(&graph());
        assert!(rows.is_empty());
    }

    #[test]
    fn keywords_are_case_insensitive_and_quotes_unescape() {
        let p = parse_pattern("match (x:`Odd``Name`) return x.`uri` as `i d`, 'it\\'s' as t")
            .expect("parse");
        assert_eq!(p.class, "Odd`Name");
        assert_eq!(p.projections[0].alias, "i d");
        assert_eq!(
            p.projections[1].value,
            ProjectionValue::Literal("it's".to_string())
        );
    }

    #[test]
    fn rejects_other_query_shapes() {
        for q in [
            "RETURN 1",
            "MATCH (n) RETURN n",
            "MATCH (a:IfcWall)-[:isContainedIn*]->(b) RETURN a.uri AS id",
            "MATCH (a:IfcWall) DETACH DELETE a",
            "MATCH (a:IfcWall) RETURN a.uri AS id; MATCH (b) DELETE b",
        ] {
            assert!(
                matches!(parse_pattern(q), Err(PatternError::Syntax(_))),
                "accepted: {q}"
            );
        }
    }

    #[test]
    fn rejects_unbound_variables() {
        let err = parse_pattern("MATCH (a:IfcWall) RETURN b.uri AS id").expect_err("unbound");
        assert_eq!(
            err,
            PatternError::UnboundVariable {
                found: "b".to_string(),
                bound: "a".to_string(),
            }
        );
    }
}

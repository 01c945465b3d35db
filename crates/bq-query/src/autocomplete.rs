//! Cursor-aware query assistance for search editors.
//!
//! Given partially typed text and a cursor position, works out whether the user is typing a
//! field name or a field value and reports what has been typed so far.

use serde::Serialize;

use crate::{
    ast::{Expression, LogicalOperator, StringExpression, Tag, Value},
    error::SyntaxErrorKind,
    parser::parse,
};

/// Prompt shown when the cursor sits on a tag with no value.
pub const EXISTS_PROMPT: &str =
    "(search for if specified field exists - add a value to search for a value)";

/// What the editor should offer at the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Completion {
    /// Nothing typed yet.
    Initial,
    /// The cursor is not on anything that can be completed.
    None,
    /// The query does not parse.
    Error {
        /// 1-based column of the problem.
        column: usize,
        /// User-facing description.
        message: String,
    },
    /// The cursor is on a field key.
    FieldName {
        /// Key typed so far.
        prefix: String,
        /// Whether the tag already has a value.
        has_value: bool,
        /// Matching mode for the prefix.
        prefix_type: String,
    },
    /// The cursor is on a field value, or on a tag's operator.
    FieldValue {
        /// Field the value belongs to; `None` for a global search.
        key: Option<String>,
        /// Value typed so far.
        prefix: String,
        /// Matching mode for the prefix.
        prefix_type: String,
    },
}

/// Which part of a tag the cursor landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    /// The field key.
    Key,
    /// The field value.
    Value,
    /// The tag as a whole, e.g. its comparator or inner whitespace.
    None,
}

/// A node found under the cursor.
#[derive(Debug, Clone, Copy)]
enum Located<'a> {
    /// A tag's key.
    Key(&'a StringExpression),
    /// A tag's value.
    Value(&'a Value),
    /// A tag.
    Tag(&'a Tag),
}

/// An ancestor of the located node.
#[derive(Debug, Clone, Copy)]
enum Parent<'a> {
    /// An enclosing boolean node.
    Logical(&'a LogicalOperator),
    /// The tag owning a key or value.
    Tag(&'a Tag),
}

/// Result of descending the tree towards the cursor.
#[derive(Debug)]
struct TreeWalk<'a> {
    /// The innermost node under the cursor.
    value: Located<'a>,
    /// Which part of a tag it is.
    branch: Branch,
    /// Ancestors, outermost first.
    parents: Vec<Parent<'a>>,
}

/// Suggests what to complete at byte offset `cursor` of `text`.
pub fn autocomplete(text: &str, cursor: usize) -> Completion {
    let text = text.trim_end();
    if text.is_empty() {
        return Completion::Initial;
    }

    let expr = match parse(text) {
        Ok(Some(expr)) => expr,
        Ok(None) => return Completion::Initial,
        Err(err) => {
            return Completion::Error {
                column: err.column,
                message: error_message(err.kind).to_string(),
            };
        }
    };

    let Some(walk) = current_node(&expr, cursor) else {
        return Completion::None;
    };

    classify(&walk)
}

/// Fixed user-facing message for each class of syntax error.
fn error_message(kind: SyntaxErrorKind) -> &'static str {
    match kind {
        SyntaxErrorKind::UnexpectedToken => {
            "Unexpected token - check that operators and brackets are in the right place"
        }
        SyntaxErrorKind::UnexpectedCharacters => {
            "Unexpected characters - check for unclosed quotes, brackets or invalid escapes"
        }
        SyntaxErrorKind::UnexpectedInput => {
            "Unexpected input - the query is incomplete or contains an invalid value"
        }
    }
}

/// Depth-first search for the innermost node containing `cursor`.
fn current_node(expr: &Expression, cursor: usize) -> Option<TreeWalk<'_>> {
    match expr {
        Expression::Logical(node) => {
            let mut walk = node
                .children
                .iter()
                .find_map(|child| current_node(child, cursor))?;
            walk.parents.insert(0, Parent::Logical(node));
            Some(walk)
        }
        Expression::Tag(tag) if tag.location.contains(cursor) => {
            if let Some(key) = tag.key.as_ref().filter(|k| k.location.contains(cursor)) {
                return Some(TreeWalk {
                    value: Located::Key(key),
                    branch: Branch::Key,
                    parents: vec![Parent::Tag(tag)],
                });
            }
            if let Some(value) = tag.value.as_ref().filter(|v| v.location().contains(cursor)) {
                return Some(TreeWalk {
                    value: Located::Value(value),
                    branch: Branch::Value,
                    parents: vec![Parent::Tag(tag)],
                });
            }
            Some(TreeWalk {
                value: Located::Tag(tag),
                branch: Branch::None,
                parents: Vec::new(),
            })
        }
        Expression::Tag(_) => None,
    }
}

/// Turns a located node into a completion.
fn classify(walk: &TreeWalk<'_>) -> Completion {
    let parent_tag = match walk.parents.last() {
        Some(Parent::Tag(tag)) => Some(*tag),
        _ => None,
    };

    match (walk.branch, walk.value, parent_tag) {
        (Branch::Value, Located::Value(value), Some(tag)) => {
            let (prefix, prefix_type) = describe_value(value);
            Completion::FieldValue {
                key: key_of(tag),
                prefix,
                prefix_type: prefix_type.to_string(),
            }
        }
        (Branch::Key, Located::Key(key), Some(tag)) => Completion::FieldName {
            prefix: key.value.clone(),
            has_value: tag.value.is_some(),
            prefix_type: "case-insensitive".to_string(),
        },
        (Branch::None, Located::Tag(tag), _) => {
            let (prefix, prefix_type) = match &tag.value {
                Some(value) => describe_value(value),
                None => (EXISTS_PROMPT.to_string(), "empty"),
            };
            Completion::FieldValue {
                key: key_of(tag),
                prefix,
                prefix_type: prefix_type.to_string(),
            }
        }
        _ => Completion::None,
    }
}

/// The tag's key text, if any.
fn key_of(tag: &Tag) -> Option<String> {
    tag.key.as_ref().map(|k| k.value.clone())
}

/// Renders a value as a prefix and its matching mode.
fn describe_value(value: &Value) -> (String, &'static str) {
    match value {
        Value::String(s) if s.case_insensitive() => (s.value.clone(), "case-insensitive"),
        Value::String(s) => (s.value.clone(), "case-sensitive"),
        Value::Number(n) => (n.value.to_string(), "numeric"),
        Value::Range(r) => {
            let side = |inclusive: bool| if inclusive { "inclusive" } else { "exclusive" };
            (
                format!(
                    "{} ({}) to {} ({})",
                    r.start,
                    side(r.start_inclusive),
                    r.end,
                    side(r.end_inclusive)
                ),
                "range",
            )
        }
    }
}

//! Query abstract syntax tree.
//!
//! Every node produced by the parser records the span of source text it was built from, so
//! editor tooling can map a cursor position back onto the tree.

use std::fmt;

use serde::Serialize;

/// Half-open byte range `[start, end)` into the original query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TokenLocation {
    /// First byte of the span.
    pub start: usize,
    /// One past the last byte of the span.
    pub end: usize,
}

impl TokenLocation {
    /// Creates a location. `start` must not exceed `end`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "location start {start} past end {end}");
        Self { start, end }
    }

    /// Returns true if `offset` falls inside this span.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Returns the smallest span covering both locations.
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Returns the span with its end moved `len` bytes further.
    pub fn extend(&self, len: usize) -> Self {
        Self {
            start: self.start,
            end: self.end + len,
        }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true for a zero-width span.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the source text covered by this span, if it lies within `text`.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end)
    }
}

/// Quoting style of a string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quotes {
    /// Bare, unquoted text.
    None,
    /// `'single quoted'`.
    Single,
    /// `"double quoted"`.
    Double,
}

/// A string literal, used both for keys and for values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringExpression {
    /// Unescaped text.
    pub value: String,
    /// How the literal was quoted in the source.
    pub quotes: Quotes,
    /// Source span, including any quotes.
    pub location: TokenLocation,
}

impl StringExpression {
    /// Only double quotes make a search case-sensitive.
    pub fn case_insensitive(&self) -> bool {
        self.quotes != Quotes::Double
    }
}

/// Numeric payload of a [`NumberExpression`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    /// Whole number.
    Int(i64),
    /// Decimal number.
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
        }
    }
}

/// A numeric literal, after any filesize unit has been applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberExpression {
    /// The value.
    pub value: Number,
    /// Source span, including any unit suffix.
    pub location: TokenLocation,
}

/// An integer range such as `[1 TO 10)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeExpression {
    /// Lower bound.
    pub start: i64,
    /// Whether the lower bound itself matches (`[`).
    pub start_inclusive: bool,
    /// Upper bound.
    pub end: i64,
    /// Whether the upper bound itself matches (`]`).
    pub end_inclusive: bool,
    /// Source span from opening to closing bracket.
    pub location: TokenLocation,
}

/// The value side of a tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Value {
    /// String literal.
    String(StringExpression),
    /// Numeric literal.
    Number(NumberExpression),
    /// Integer range.
    Range(RangeExpression),
}

impl Value {
    /// Source span of the value.
    pub fn location(&self) -> TokenLocation {
        match self {
            Self::String(s) => s.location,
            Self::Number(n) => n.location,
            Self::Range(r) => r.location,
        }
    }
}

/// Comparison operator between a key and its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Comparator {
    /// `:` loose match (case-insensitive unless double quoted, `*` suffix for prefix).
    #[serde(rename = ":")]
    Match,
    /// `:=` exact match.
    #[serde(rename = ":=")]
    Equal,
    /// `:>`
    #[serde(rename = ":>")]
    Greater,
    /// `:<`
    #[serde(rename = ":<")]
    Less,
    /// `:>=`
    #[serde(rename = ":>=")]
    GreaterOrEqual,
    /// `:<=`
    #[serde(rename = ":<=")]
    LessOrEqual,
}

impl Comparator {
    /// The operator as written in a query.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Match => ":",
            Self::Equal => ":=",
            Self::Greater => ":>",
            Self::Less => ":<",
            Self::GreaterOrEqual => ":>=",
            Self::LessOrEqual => ":<=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single search term, optionally scoped to a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    /// Span of the whole tag.
    pub location: TokenLocation,
    /// Field key; `None` for a global search.
    pub key: Option<StringExpression>,
    /// Comparator; present exactly when `key` is.
    pub comparator: Option<Comparator>,
    /// Value; `None` on a keyed tag means "field must exist".
    pub value: Option<Value>,
}

impl Tag {
    /// A keyless tag searching `value` across the default fields.
    pub fn global(value: Value) -> Self {
        Self {
            location: value.location(),
            key: None,
            comparator: None,
            value: Some(value),
        }
    }

    /// A `key<comparator>value` tag.
    ///
    /// `comparator_len` is the byte length of the comparator as written; it extends the key's
    /// span when there is no value.
    pub fn keyed(
        key: StringExpression,
        comparator: Comparator,
        comparator_len: usize,
        value: Option<Value>,
    ) -> Self {
        let location = match &value {
            Some(v) => key.location.combine(&v.location()),
            None => key.location.extend(comparator_len),
        };
        Self {
            location,
            key: Some(key),
            comparator: Some(comparator),
            value,
        }
    }
}

/// Boolean connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    /// All children must match.
    And,
    /// At least one child must match.
    Or,
    /// The single child must not match.
    Not,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        })
    }
}

/// A boolean node over child expressions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicalOperator {
    /// The connective.
    pub operator: Operator,
    /// Children; exactly one for `Not`.
    pub children: Vec<Expression>,
}

/// A parsed query expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Expression {
    /// Boolean combination.
    Logical(LogicalOperator),
    /// Search term.
    Tag(Tag),
}

impl Expression {
    /// Creates an AND expression, splicing in children that are themselves ANDs.
    ///
    /// A single child is returned unwrapped.
    pub fn and(children: Vec<Self>) -> Self {
        Self::flattened(Operator::And, children)
    }

    /// Creates an OR expression, splicing in children that are themselves ORs.
    ///
    /// A single child is returned unwrapped.
    pub fn or(children: Vec<Self>) -> Self {
        Self::flattened(Operator::Or, children)
    }

    /// Creates a NOT expression. Never flattened.
    pub fn not(child: Self) -> Self {
        Self::Logical(LogicalOperator {
            operator: Operator::Not,
            children: vec![child],
        })
    }

    /// Shared constructor for the n-ary connectives.
    fn flattened(operator: Operator, children: Vec<Self>) -> Self {
        let mut flattened: Vec<Self> = children
            .into_iter()
            .flat_map(|child| match child {
                Self::Logical(inner) if inner.operator == operator => inner.children,
                other => vec![other],
            })
            .collect();

        if flattened.len() == 1
            && let Some(only) = flattened.pop()
        {
            return only;
        }

        Self::Logical(LogicalOperator {
            operator,
            children: flattened,
        })
    }

    /// Returns the tag if this expression is one.
    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Self::Tag(tag) => Some(tag),
            Self::Logical(_) => None,
        }
    }

    /// Formats the expression as a tree structure with the given indentation level.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        match self {
            Self::Logical(node) => {
                writeln!(f, "{prefix}{}", node.operator)?;
                for child in &node.children {
                    child.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
            Self::Tag(tag) => {
                let loc = tag.location;
                match (&tag.key, tag.comparator) {
                    (Some(key), Some(op)) => {
                        write!(f, "{prefix}Tag({:?} {op}", key.value)?;
                    }
                    _ => write!(f, "{prefix}Tag(*")?,
                }
                match &tag.value {
                    Some(value) => write!(f, " {}", fmt_value(value))?,
                    None => write!(f, " <exists>")?,
                }
                writeln!(f, ") @{}..{}", loc.start, loc.end)
            }
        }
    }

    /// Renders the expression back into query syntax.
    ///
    /// The output parses to an equivalent tree, though spacing, keyword case and grouping
    /// are normalized.
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Logical(node) => match node.operator {
                Operator::Not => {
                    let inner = node
                        .children
                        .first()
                        .map(Self::to_grouped_string)
                        .unwrap_or_default();
                    format!("NOT {inner}")
                }
                op => node
                    .children
                    .iter()
                    .map(Self::to_grouped_string)
                    .collect::<Vec<_>>()
                    .join(&format!(" {op} ")),
            },
            Self::Tag(tag) => {
                let mut out = String::new();
                if let (Some(key), Some(op)) = (&tag.key, tag.comparator) {
                    out.push_str(&quote_string(key));
                    out.push_str(op.as_str());
                }
                if let Some(value) = &tag.value {
                    out.push_str(&query_value(value));
                }
                out
            }
        }
    }

    /// Query string for a child, parenthesized when it is itself a connective.
    fn to_grouped_string(&self) -> String {
        match self {
            Self::Logical(node) if node.operator != Operator::Not => {
                format!("({})", self.to_query_string())
            }
            _ => self.to_query_string(),
        }
    }
}

/// Debug-style rendering of a value for the tree view.
fn fmt_value(value: &Value) -> String {
    match value {
        Value::String(s) => match s.quotes {
            Quotes::None => format!("{:?}", s.value),
            Quotes::Single => format!("'{:?}'", s.value),
            Quotes::Double => format!("\"{:?}\"", s.value),
        },
        Value::Number(n) => format!("#{}", query_number(n.value)),
        Value::Range(_) => query_value(value),
    }
}

/// Renders a value in query syntax.
fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => quote_string(s),
        Value::Number(n) => query_number(n.value),
        Value::Range(r) => format!(
            "{}{} TO {}{}",
            if r.start_inclusive { '[' } else { '(' },
            r.start,
            r.end,
            if r.end_inclusive { ']' } else { ')' }
        ),
    }
}

/// Renders a number so that it reparses with the same type.
///
/// Floats always carry a decimal point; `f64` display never uses exponent notation.
fn query_number(n: Number) -> String {
    match n {
        Number::Int(v) => v.to_string(),
        Number::Float(v) => {
            let text = v.to_string();
            if v.is_finite() && !text.contains('.') {
                format!("{text}.0")
            } else {
                text
            }
        }
    }
}

/// Renders a string literal with its original quoting, escaping as needed.
fn quote_string(s: &StringExpression) -> String {
    let quote = match s.quotes {
        Quotes::None => return s.value.clone(),
        Quotes::Single => '\'',
        Quotes::Double => '"',
    };
    let mut out = String::with_capacity(s.value.len() + 2);
    out.push(quote);
    for ch in s.value.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' | '"' | '\'' => {
                out.push('\\');
                out.push(ch);
            }
            other => out.push(other),
        }
    }
    out.push(quote);
    out
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str, start: usize) -> Expression {
        Expression::Tag(Tag::global(Value::String(StringExpression {
            value: s.into(),
            quotes: Quotes::None,
            location: TokenLocation::new(start, start + s.len()),
        })))
    }

    #[test]
    fn location_contains_is_half_open() {
        let loc = TokenLocation::new(2, 5);
        assert!(!loc.contains(1));
        assert!(loc.contains(2));
        assert!(loc.contains(4));
        assert!(!loc.contains(5));
    }

    #[test]
    fn location_combine_covers_both() {
        let a = TokenLocation::new(4, 7);
        let b = TokenLocation::new(0, 2);
        assert_eq!(a.combine(&b), TokenLocation::new(0, 7));
        assert_eq!(b.combine(&a), TokenLocation::new(0, 7));
    }

    #[test]
    fn location_slice_out_of_range() {
        assert_eq!(TokenLocation::new(0, 3).slice("ab"), None);
        assert_eq!(TokenLocation::new(1, 2).slice("ab"), Some("b"));
    }

    #[test]
    fn and_flattens_nested() {
        let nested = Expression::and(vec![
            word("a", 0),
            Expression::and(vec![word("b", 2), word("c", 4)]),
        ]);

        assert_eq!(
            nested,
            Expression::Logical(LogicalOperator {
                operator: Operator::And,
                children: vec![word("a", 0), word("b", 2), word("c", 4)],
            })
        );
    }

    #[test]
    fn and_does_not_splice_or() {
        let mixed = Expression::and(vec![
            word("a", 0),
            Expression::or(vec![word("b", 2), word("c", 4)]),
        ]);
        let Expression::Logical(node) = mixed else {
            panic!("expected logical node");
        };
        assert_eq!(node.children.len(), 2);
    }

    #[test]
    fn single_child_unwraps() {
        assert_eq!(Expression::and(vec![word("a", 0)]), word("a", 0));
        assert_eq!(Expression::or(vec![word("a", 0)]), word("a", 0));
    }

    #[test]
    fn not_never_flattens() {
        let double = Expression::not(Expression::not(word("a", 0)));
        let Expression::Logical(outer) = &double else {
            panic!("expected logical node");
        };
        assert_eq!(outer.operator, Operator::Not);
        assert_eq!(outer.children.len(), 1);
    }

    #[test]
    fn keyed_tag_without_value_extends_over_comparator() {
        let key = StringExpression {
            value: "size".into(),
            quotes: Quotes::None,
            location: TokenLocation::new(0, 4),
        };
        let tag = Tag::keyed(key, Comparator::GreaterOrEqual, 3, None);
        assert_eq!(tag.location, TokenLocation::new(0, 7));
    }

    #[test]
    fn case_insensitivity_follows_quotes() {
        let mut s = StringExpression {
            value: "Foo".into(),
            quotes: Quotes::None,
            location: TokenLocation::default(),
        };
        assert!(s.case_insensitive());
        s.quotes = Quotes::Single;
        assert!(s.case_insensitive());
        s.quotes = Quotes::Double;
        assert!(!s.case_insensitive());
    }

    #[test]
    fn query_string_groups_nested_connectives() {
        let expr = Expression::and(vec![
            word("a", 0),
            Expression::or(vec![word("b", 2), word("c", 4)]),
            Expression::not(word("d", 6)),
        ]);
        assert_eq!(expr.to_query_string(), "a AND (b OR c) AND NOT d");
    }
}

//! Query parser.
//!
//! Parses a token stream into a query AST using recursive descent.
//!
//! # Grammar
//!
//! ```text
//! query    → or_expr*
//! or_expr  → and_expr ("OR" and_expr)*
//! and_expr → not_expr ("AND" not_expr)*
//! not_expr → ("NOT" | "!") not_expr | atom
//! atom     → "(" or_expr+ ")" | tag
//! tag      → KEY COMPARATOR value? | value
//! value    → STRING | NUMBER | range
//! range    → ("[" | "(") INT "TO" INT ("]" | ")")
//! ```
//!
//! # Precedence (highest to lowest)
//!
//! 1. Grouping: `(...)`
//! 2. Negation: `NOT`, `!`
//! 3. `AND`
//! 4. `OR`
//! 5. Implicit AND between adjacent expressions

use crate::{
    ast::{
        Comparator, Expression, Number, NumberExpression, Quotes, RangeExpression,
        StringExpression, Tag, TokenLocation, Value,
    },
    error::{SyntaxError, SyntaxErrorKind},
    lexer::{Token, TokenKind, tokenize},
};

/// Filesize unit suffixes and their multipliers.
const FILESIZE_UNITS: &[(&str, i64)] = &[
    ("b", 1),
    ("kb", 1_000),
    ("kib", 1 << 10),
    ("mb", 1_000_000),
    ("mib", 1 << 20),
    ("gb", 1_000_000_000),
    ("gib", 1 << 30),
    ("tb", 1_000_000_000_000),
    ("tib", 1 << 40),
];

/// Why a word could not be read as a number.
#[derive(Debug, PartialEq, Eq)]
enum NumberError {
    /// The unit multiplier pushed the value past `i64`.
    Overflow,
}

/// Interprets an unquoted word as a number with an optional filesize unit.
///
/// Returns `Ok(None)` when the word is not numeric and should stay a string.
fn parse_number(word: &str) -> Result<Option<Number>, NumberError> {
    let digits_end = numeric_prefix_len(word);
    if digits_end == 0 {
        return Ok(None);
    }
    let (numeral, suffix) = word.split_at(digits_end);

    let multiplier = if suffix.is_empty() {
        None
    } else {
        match FILESIZE_UNITS
            .iter()
            .find(|(unit, _)| suffix.eq_ignore_ascii_case(unit))
        {
            Some(&(_, multiplier)) => Some(multiplier),
            None => return Ok(None),
        }
    };

    if numeral.contains('.') {
        let Ok(value) = numeral.parse::<f64>() else {
            return Ok(None);
        };
        let scaled = multiplier.map_or(value, |m| value * m as f64);
        return Ok(Some(Number::Float(scaled)));
    }

    match (numeral.parse::<i64>(), multiplier) {
        (Ok(value), None) => Ok(Some(Number::Int(value))),
        (Ok(value), Some(m)) => value
            .checked_mul(m)
            .map(|v| Some(Number::Int(v)))
            .ok_or(NumberError::Overflow),
        // Digit runs too long for i64 are identifiers, not quantities.
        (Err(_), None) => Ok(None),
        (Err(_), Some(_)) => Err(NumberError::Overflow),
    }
}

/// Length of the leading `-?digits(.digits)?` numeral in `word`, or 0 if there is none.
fn numeric_prefix_len(word: &str) -> usize {
    let bytes = word.as_bytes();
    let mut idx = usize::from(bytes.first() == Some(&b'-'));
    let int_start = idx;
    while bytes.get(idx).is_some_and(u8::is_ascii_digit) {
        idx += 1;
    }
    if idx == int_start {
        return 0;
    }
    if bytes.get(idx) == Some(&b'.') && bytes.get(idx + 1).is_some_and(u8::is_ascii_digit) {
        idx += 1;
        while bytes.get(idx).is_some_and(u8::is_ascii_digit) {
            idx += 1;
        }
    }
    idx
}

/// Recursive descent parser for query expressions.
struct Parser<'a> {
    /// The original query text, for error columns.
    input: &'a str,
    /// Token stream to parse.
    tokens: Vec<Token>,
    /// Current position in token stream.
    position: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser from a token stream.
    fn new(input: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            input,
            tokens,
            position: 0,
        }
    }

    /// Parses the token stream as an implicit AND of top-level expressions.
    fn parse(mut self) -> Result<Option<Expression>, SyntaxError> {
        let mut exprs = Vec::new();
        while self.peek().is_some() {
            exprs.push(self.parse_or_expr()?);
        }

        if exprs.is_empty() {
            return Ok(None);
        }
        Ok(Some(Expression::and(exprs)))
    }

    /// Parses: or_expr → and_expr ("OR" and_expr)*
    fn parse_or_expr(&mut self) -> Result<Expression, SyntaxError> {
        let mut operands = vec![self.parse_and_expr()?];

        while self.check(&TokenKind::Or) {
            self.advance();
            self.expect_operand("OR")?;
            operands.push(self.parse_and_expr()?);
        }

        Ok(Expression::or(operands))
    }

    /// Parses: and_expr → not_expr ("AND" not_expr)*
    fn parse_and_expr(&mut self) -> Result<Expression, SyntaxError> {
        let mut operands = vec![self.parse_not_expr()?];

        while self.check(&TokenKind::And) {
            self.advance();
            self.expect_operand("AND")?;
            operands.push(self.parse_not_expr()?);
        }

        Ok(Expression::and(operands))
    }

    /// Parses: not_expr → ("NOT" | "!") not_expr | atom
    fn parse_not_expr(&mut self) -> Result<Expression, SyntaxError> {
        if self.check(&TokenKind::Not) {
            self.advance();
            self.expect_operand("NOT")?;
            let child = self.parse_not_expr()?;
            return Ok(Expression::not(child));
        }

        self.parse_atom()
    }

    /// Parses: atom → "(" or_expr+ ")" | tag
    fn parse_atom(&mut self) -> Result<Expression, SyntaxError> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.end_of_query());
        };

        match &token.kind {
            TokenKind::LParen if !self.range_ahead() => self.parse_group(),
            TokenKind::LParen | TokenKind::LBracket => {
                let range = self.parse_range()?;
                Ok(Expression::Tag(Tag::global(Value::Range(range))))
            }
            TokenKind::Word(_) | TokenKind::Quoted { .. } => self.parse_tag(),
            TokenKind::Comparator(op) => Err(self.unexpected(
                &token,
                format!("unexpected '{op}' (needs a field name before it)"),
            )),
            TokenKind::RParen => Err(self.unexpected(&token, "unexpected ')'")),
            TokenKind::RBracket => Err(self.unexpected(&token, "unexpected ']'")),
            TokenKind::And => Err(self.unexpected(
                &token,
                "unexpected AND (needs an expression before it)",
            )),
            TokenKind::Or => Err(self.unexpected(
                &token,
                "unexpected OR (needs an expression before it)",
            )),
            TokenKind::Not => unreachable!("parse_not_expr consumes NOT"),
        }
    }

    /// Parses a parenthesized group, consuming the surrounding parentheses.
    fn parse_group(&mut self) -> Result<Expression, SyntaxError> {
        let open = self.tokens[self.position].location;
        self.advance(); // consume (

        let mut exprs = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(SyntaxError::at(
                        SyntaxErrorKind::UnexpectedCharacters,
                        self.input,
                        open.start,
                        "unclosed '('",
                    ));
                }
                Some(token) if token.kind == TokenKind::RParen => {
                    if exprs.is_empty() {
                        return Err(self.unexpected(token, "empty group '()'"));
                    }
                    self.advance(); // consume )
                    return Ok(Expression::and(exprs));
                }
                Some(_) => exprs.push(self.parse_or_expr()?),
            }
        }
    }

    /// Parses: tag → KEY COMPARATOR value? | value
    fn parse_tag(&mut self) -> Result<Expression, SyntaxError> {
        if !self.key_ahead() {
            let value = self.parse_value()?;
            return Ok(Expression::Tag(Tag::global(value)));
        }

        let key = self.parse_key();
        let (comparator, comparator_loc) = match self.peek().map(|t| (&t.kind, t.location)) {
            Some((TokenKind::Comparator(op), location)) => (*op, location),
            _ => unreachable!("key_ahead checked for a comparator"),
        };
        self.advance();

        if self.key_ahead()
            && let Some(next) = self.peek()
            && next.location.start == comparator_loc.end
        {
            return Err(self.unexpected(
                next,
                "a value containing ':' must be quoted; add a space to start a new tag",
            ));
        }

        let value = if self.value_ahead() {
            Some(self.parse_value()?)
        } else {
            None
        };

        Ok(Expression::Tag(Tag::keyed(
            key,
            comparator,
            comparator_loc.len(),
            value,
        )))
    }

    /// Consumes a word or quoted string as a field key.
    fn parse_key(&mut self) -> StringExpression {
        let token = self.tokens[self.position].clone();
        self.advance();
        match token.kind {
            TokenKind::Word(value) => StringExpression {
                value,
                quotes: Quotes::None,
                location: token.location,
            },
            TokenKind::Quoted { value, quotes } => StringExpression {
                value,
                quotes,
                location: token.location,
            },
            _ => unreachable!("key_ahead checked for a string token"),
        }
    }

    /// Parses a string, number, or range value.
    fn parse_value(&mut self) -> Result<Value, SyntaxError> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.end_of_query());
        };

        match token.kind {
            TokenKind::LParen | TokenKind::LBracket => Ok(Value::Range(self.parse_range()?)),
            TokenKind::Quoted { value, quotes } => {
                self.advance();
                Ok(Value::String(StringExpression {
                    value,
                    quotes,
                    location: token.location,
                }))
            }
            TokenKind::Word(word) => {
                self.advance();
                match parse_number(&word) {
                    Ok(Some(value)) => Ok(Value::Number(NumberExpression {
                        value,
                        location: token.location,
                    })),
                    Ok(None) => Ok(Value::String(StringExpression {
                        value: word,
                        quotes: Quotes::None,
                        location: token.location,
                    })),
                    Err(NumberError::Overflow) => Err(SyntaxError::at(
                        SyntaxErrorKind::UnexpectedInput,
                        self.input,
                        token.location.start,
                        format!("number out of range: {word}"),
                    )),
                }
            }
            _ => Err(self.unexpected(&token, "expected a value")),
        }
    }

    /// Parses: range → ("[" | "(") INT "TO" INT ("]" | ")")
    fn parse_range(&mut self) -> Result<RangeExpression, SyntaxError> {
        let open = self.tokens[self.position].clone();
        let start_inclusive = open.kind == TokenKind::LBracket;
        self.advance();

        let start = self.parse_range_bound(&open)?;

        match self.peek() {
            Some(Token {
                kind: TokenKind::Word(word),
                ..
            }) if word.eq_ignore_ascii_case("TO") => self.advance(),
            Some(token) => return Err(self.unexpected(token, "expected TO in range")),
            None => return Err(self.unclosed_range(&open)),
        }

        let end = self.parse_range_bound(&open)?;

        let end_inclusive = match self.peek() {
            Some(token) if token.kind == TokenKind::RBracket => true,
            Some(token) if token.kind == TokenKind::RParen => false,
            Some(token) => {
                return Err(self.unexpected(token, "expected ']' or ')' to close range"));
            }
            None => return Err(self.unclosed_range(&open)),
        };
        let close = self.tokens[self.position].location;
        self.advance();

        Ok(RangeExpression {
            start,
            start_inclusive,
            end,
            end_inclusive,
            location: open.location.combine(&close),
        })
    }

    /// Parses one integer bound of a range.
    fn parse_range_bound(&mut self, open: &Token) -> Result<i64, SyntaxError> {
        let Some(token) = self.peek() else {
            return Err(self.unclosed_range(open));
        };

        let TokenKind::Word(word) = &token.kind else {
            return Err(self.unexpected(token, "expected an integer range bound"));
        };

        match parse_number(word) {
            Ok(Some(Number::Int(value))) => {
                self.advance();
                Ok(value)
            }
            Err(NumberError::Overflow) => Err(SyntaxError::at(
                SyntaxErrorKind::UnexpectedInput,
                self.input,
                token.location.start,
                format!("range bound out of range: {word}"),
            )),
            Ok(_) => Err(SyntaxError::at(
                SyntaxErrorKind::UnexpectedInput,
                self.input,
                token.location.start,
                format!("range bounds must be integers, found '{word}'"),
            )),
        }
    }

    /// Returns true if the current token starts a field key: a string immediately followed by
    /// a comparator.
    fn key_ahead(&self) -> bool {
        let (Some(current), Some(next)) = (
            self.tokens.get(self.position),
            self.tokens.get(self.position + 1),
        ) else {
            return false;
        };

        matches!(current.kind, TokenKind::Word(_) | TokenKind::Quoted { .. })
            && matches!(next.kind, TokenKind::Comparator(_))
            && current.location.end == next.location.start
    }

    /// Returns true if the current token can be a tag's value.
    fn value_ahead(&self) -> bool {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Word(_) | TokenKind::Quoted { .. }) => !self.key_ahead(),
            Some(TokenKind::LBracket) => true,
            Some(TokenKind::LParen) => self.range_ahead(),
            _ => false,
        }
    }

    /// Returns true if the current `(` opens `INT TO INT` followed by a closing bracket.
    fn range_ahead(&self) -> bool {
        let window = self
            .tokens
            .get(self.position..self.position + 5)
            .unwrap_or_default();
        let is_int = |t: &Token| match &t.kind {
            TokenKind::Word(w) => matches!(parse_number(w), Ok(Some(Number::Int(_)))),
            _ => false,
        };

        match window {
            [open, start, to, end, close] => {
                matches!(open.kind, TokenKind::LParen | TokenKind::LBracket)
                    && is_int(start)
                    && matches!(&to.kind, TokenKind::Word(w) if w.eq_ignore_ascii_case("TO"))
                    && is_int(end)
                    && matches!(close.kind, TokenKind::RParen | TokenKind::RBracket)
            }
            _ => false,
        }
    }

    /// Fails if the query ends right after an operator.
    fn expect_operand(&self, operator: &str) -> Result<(), SyntaxError> {
        if self.peek().is_none() {
            return Err(SyntaxError::at(
                SyntaxErrorKind::UnexpectedInput,
                self.input,
                self.input.len(),
                format!("unexpected end of query after {operator}"),
            ));
        }
        Ok(())
    }

    /// Error for a token in a position the grammar does not allow.
    fn unexpected(&self, token: &Token, message: impl Into<String>) -> SyntaxError {
        SyntaxError::at(
            SyntaxErrorKind::UnexpectedToken,
            self.input,
            token.location.start,
            message,
        )
    }

    /// Error for a range whose closing bracket never arrives.
    fn unclosed_range(&self, open: &Token) -> SyntaxError {
        let bracket = if open.kind == TokenKind::LBracket {
            '['
        } else {
            '('
        };
        SyntaxError::at(
            SyntaxErrorKind::UnexpectedCharacters,
            self.input,
            open.location.start,
            format!("unclosed '{bracket}' in range"),
        )
    }

    /// Error for input that stops mid-expression.
    fn end_of_query(&self) -> SyntaxError {
        SyntaxError::at(
            SyntaxErrorKind::UnexpectedInput,
            self.input,
            self.input.len(),
            "unexpected end of query",
        )
    }

    /// Returns the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// Checks if the current token is of the given kind.
    fn check(&self, kind: &TokenKind) -> bool {
        self.peek().is_some_and(|t| &t.kind == kind)
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }
}

/// Parses a query string into an AST.
///
/// Returns `Ok(None)` for empty or all-whitespace queries, `Ok(Some(expr))` for valid
/// queries, or a located [`SyntaxError`] for invalid syntax. Locations in the tree are byte
/// offsets into `input` as given, surrounding whitespace included.
pub fn parse(input: &str) -> Result<Option<Expression>, SyntaxError> {
    let tokens = tokenize(input)?;
    Parser::new(input, tokens).parse()
}

//! Syntax errors raised while tokenizing or parsing a query.

use thiserror::Error;

/// The class of a syntax error.
///
/// Callers that present errors to users (such as autocomplete) match on the kind rather than
/// on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxErrorKind {
    /// A well-formed token appeared where the grammar does not allow it.
    UnexpectedToken,
    /// A character sequence could not be tokenized, or was left unterminated.
    UnexpectedCharacters,
    /// Any other malformed input, such as a query ending after an operator.
    UnexpectedInput,
}

/// A located syntax error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at column {column}")]
pub struct SyntaxError {
    /// What went wrong.
    pub kind: SyntaxErrorKind,
    /// 1-based character column in the original query.
    pub column: usize,
    /// Description of the problem.
    pub message: String,
}

impl SyntaxError {
    /// Creates an error at byte `offset` of `input`, converting it to a character column.
    pub(crate) fn at(
        kind: SyntaxErrorKind,
        input: &str,
        offset: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            column: column_of(input, offset),
            message: message.into(),
        }
    }

    /// Formats the error with the query and a caret under the offending column.
    pub fn format_with_context(&self, query: &str) -> String {
        let mut result = format!("query syntax error: {}\n", self.message);
        result.push_str(&format!("  {query}\n"));
        result.push_str(&format!("  {}^", " ".repeat(self.column.saturating_sub(1))));
        if let Some(hint) = self.hint() {
            result.push_str(&format!("\nhint: {hint}"));
        }
        result
    }

    /// Returns a suggestion for common mistakes.
    pub fn hint(&self) -> Option<&'static str> {
        match self.kind {
            SyntaxErrorKind::UnexpectedCharacters if self.message.contains("quote") => {
                Some("Add the matching closing quote to finish the string")
            }
            SyntaxErrorKind::UnexpectedCharacters if self.message.contains("escape") => {
                Some("Valid escapes are \\n \\r \\t \\\\ \\\" and \\'")
            }
            SyntaxErrorKind::UnexpectedCharacters if self.message.contains("unclosed") => {
                Some("Add a closing bracket to match the opening one")
            }
            SyntaxErrorKind::UnexpectedInput if self.message.contains("end of query") => {
                Some("AND, OR and NOT need an expression after them")
            }
            SyntaxErrorKind::UnexpectedInput if self.message.contains("range") => {
                Some("Ranges look like [1 TO 10] or (1kb TO 1mb]")
            }
            _ => None,
        }
    }
}

/// 1-based character column for a byte offset, clamped to one past the end of `input`.
fn column_of(input: &str, offset: usize) -> usize {
    let clamped = offset.min(input.len());
    input
        .char_indices()
        .take_while(|(idx, _)| *idx < clamped)
        .count()
        + 1
}

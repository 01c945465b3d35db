//! Query lexer (tokenizer).
//!
//! Converts a query string into a stream of located tokens for the parser.

use std::{iter::Peekable, str::CharIndices};

use crate::{
    ast::{Comparator, Quotes, TokenLocation},
    error::{SyntaxError, SyntaxErrorKind},
};

/// The kind of a token in the query language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A bare run of non-operator characters.
    Word(String),

    /// A quoted string, already unescaped.
    Quoted {
        /// String content without quotes.
        value: String,
        /// Quote style.
        quotes: Quotes,
    },

    /// One of `:`, `:=`, `:>`, `:<`, `:>=`, `:<=`.
    Comparator(Comparator),

    /// The AND keyword.
    And,

    /// The OR keyword.
    Or,

    /// The NOT keyword or `!`.
    Not,

    /// Left parenthesis.
    LParen,

    /// Right parenthesis.
    RParen,

    /// Left square bracket.
    LBracket,

    /// Right square bracket.
    RBracket,
}

/// A token with its source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What was read.
    pub kind: TokenKind,
    /// Where it was read from.
    pub location: TokenLocation,
}

/// Returns true for characters that always end a bare word.
fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '(' | ')' | '[' | ']' | ':')
}

/// Tokenizes a query string.
struct Lexer<'a> {
    /// The original input string.
    input: &'a str,
    /// Character iterator with one-character lookahead.
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    /// Creates an unexpected-characters error at a byte offset.
    fn error_at(&self, message: impl Into<String>, offset: usize) -> SyntaxError {
        SyntaxError::at(
            SyntaxErrorKind::UnexpectedCharacters,
            self.input,
            offset,
            message,
        )
    }

    /// Current byte offset.
    fn position(&mut self) -> usize {
        self.chars
            .peek()
            .map_or(self.input.len(), |&(offset, _)| offset)
    }

    /// Tokenizes the entire input, returning all tokens or an error.
    fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Returns the next token, or None if at end of input.
    fn next_token(&mut self) -> Result<Option<Token>, SyntaxError> {
        self.skip_whitespace();

        let Some(&(start, ch)) = self.chars.peek() else {
            return Ok(None);
        };

        let kind = match ch {
            '"' | '\'' => return self.read_quoted(start, ch).map(Some),
            ':' => return Ok(Some(self.read_comparator(start))),
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '!' => TokenKind::Not,
            _ => return Ok(Some(self.read_word(start))),
        };
        self.chars.next();

        Ok(Some(Token {
            kind,
            location: TokenLocation::new(start, start + ch.len_utf8()),
        }))
    }

    /// Reads a quoted string, resolving escape sequences.
    fn read_quoted(&mut self, start: usize, quote: char) -> Result<Token, SyntaxError> {
        self.chars.next(); // consume opening quote

        let quotes = if quote == '"' {
            Quotes::Double
        } else {
            Quotes::Single
        };
        let mut value = String::new();

        loop {
            match self.chars.next() {
                Some((offset, ch)) if ch == quote => {
                    return Ok(Token {
                        kind: TokenKind::Quoted { value, quotes },
                        location: TokenLocation::new(start, offset + ch.len_utf8()),
                    });
                }
                Some((offset, '\\')) => {
                    let escaped = match self.chars.next() {
                        Some((_, 'n')) => '\n',
                        Some((_, 'r')) => '\r',
                        Some((_, 't')) => '\t',
                        Some((_, c @ ('\\' | '"' | '\''))) => c,
                        Some((_, other)) => {
                            return Err(
                                self.error_at(format!("invalid escape sequence '\\{other}'"), offset)
                            );
                        }
                        None => {
                            return Err(self.error_at("unterminated escape sequence", offset));
                        }
                    };
                    value.push(escaped);
                }
                Some((_, ch)) => value.push(ch),
                None => return Err(self.error_at("unclosed quote", start)),
            }
        }
    }

    /// Reads a comparator, preferring the longest match.
    fn read_comparator(&mut self, start: usize) -> Token {
        self.chars.next(); // consume ':'

        let comparator = match self.chars.peek().map(|&(_, c)| c) {
            Some('=') => {
                self.chars.next();
                Comparator::Equal
            }
            Some(c @ ('>' | '<')) => {
                self.chars.next();
                let or_equal = self.chars.next_if(|&(_, c)| c == '=').is_some();
                match (c, or_equal) {
                    ('>', false) => Comparator::Greater,
                    ('>', true) => Comparator::GreaterOrEqual,
                    (_, false) => Comparator::Less,
                    (_, true) => Comparator::LessOrEqual,
                }
            }
            _ => Comparator::Match,
        };

        Token {
            kind: TokenKind::Comparator(comparator),
            location: TokenLocation::new(start, start + comparator.as_str().len()),
        }
    }

    /// Reads a bare word, recognizing the AND/OR/NOT keywords.
    ///
    /// A keyword directly followed by a comparator is a field key, not a keyword.
    fn read_word(&mut self, start: usize) -> Token {
        while self.chars.next_if(|&(_, c)| !is_delimiter(c)).is_some() {}

        let end = self.position();
        let word = &self.input[start..end];
        let followed_by_comparator = self.chars.peek().is_some_and(|&(_, c)| c == ':');

        let kind = if followed_by_comparator {
            TokenKind::Word(word.to_string())
        } else if word.eq_ignore_ascii_case("AND") {
            TokenKind::And
        } else if word.eq_ignore_ascii_case("OR") {
            TokenKind::Or
        } else if word.eq_ignore_ascii_case("NOT") {
            TokenKind::Not
        } else {
            TokenKind::Word(word.to_string())
        };

        Token {
            kind,
            location: TokenLocation::new(start, end),
        }
    }

    /// Skips whitespace characters.
    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {}
    }
}

/// Tokenizes a query string.
pub fn tokenize(input: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(input).tokenize()
}

//! Syntax highlighting and terminal colors for bq.
//!
//! Highlights the JSON and TOML that bq prints, colors query text token by token, and offers
//! small helpers for styled status lines.

#![warn(missing_docs)]

use bq_query::{TokenKind, tokenize};
use syntect::{
    easy::HighlightLines,
    highlighting::Style,
    parsing::SyntaxSet,
    util::{LinesWithEndings, as_24_bit_terminal_escaped},
};
use two_face::{
    syntax::extra_newlines as extra_syntaxes,
    theme::{EmbeddedLazyThemeSet, EmbeddedThemeName, extra as extra_themes},
};

/// A syntax highlighter for terminal output.
pub struct Highlighter {
    /// Language definitions, including TOML and JSON.
    syntax_set: SyntaxSet,
    /// Color themes.
    theme_set: EmbeddedLazyThemeSet,
    /// The theme to use.
    theme: EmbeddedThemeName,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    /// Creates a new highlighter with the default theme (Dracula).
    pub fn new() -> Self {
        Self {
            syntax_set: extra_syntaxes(),
            theme_set: extra_themes(),
            theme: EmbeddedThemeName::Dracula,
        }
    }

    /// Highlights JSON content for terminal output.
    pub fn highlight_json(&self, content: &str) -> String {
        self.highlight(content, "json")
    }

    /// Highlights TOML content for terminal output.
    pub fn highlight_toml(&self, content: &str) -> String {
        self.highlight(content, "toml")
    }

    /// Highlights content with the specified syntax for terminal output.
    ///
    /// If the syntax is not found, the content is treated as plain text.
    pub fn highlight(&self, content: &str, syntax_name: &str) -> String {
        let syntax = self
            .syntax_set
            .find_syntax_by_extension(syntax_name)
            .or_else(|| self.syntax_set.find_syntax_by_name(syntax_name))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self.theme_set.get(self.theme);
        let mut highlighter = HighlightLines::new(syntax, theme);

        let mut output = String::new();
        for line in LinesWithEndings::from(content) {
            let ranges: Vec<(Style, &str)> = highlighter
                .highlight_line(line, &self.syntax_set)
                .unwrap_or_else(|_| vec![(Style::default(), line)]);
            output.push_str(&as_24_bit_terminal_escaped(&ranges[..], false));
        }
        output.push_str(colors::RESET);
        output
    }
}

/// ANSI color codes for terminal output.
pub mod colors {
    /// Bold text.
    pub const BOLD: &str = "\x1b[1m";
    /// Cyan text (headers, field keys).
    pub const CYAN: &str = "\x1b[36m";
    /// Green text (success, string values).
    pub const GREEN: &str = "\x1b[32m";
    /// Yellow text (warnings, comparators).
    pub const YELLOW: &str = "\x1b[33m";
    /// Magenta text (boolean keywords).
    pub const MAGENTA: &str = "\x1b[35m";
    /// Red text (errors).
    pub const RED: &str = "\x1b[31m";
    /// Dim/gray text (punctuation, less important info).
    pub const DIM: &str = "\x1b[2m";
    /// Reset all formatting.
    pub const RESET: &str = "\x1b[0m";
}

/// Colors query text by token.
///
/// Field keys are cyan, comparators yellow, keywords bold magenta, quoted strings green, and
/// brackets dim. Whitespace is preserved. Text that fails to tokenize is returned unchanged.
pub fn highlight_query(query: &str) -> String {
    let Ok(tokens) = tokenize(query) else {
        return query.to_string();
    };

    let mut output = String::with_capacity(query.len() * 2);
    let mut last = 0;
    for (i, token) in tokens.iter().enumerate() {
        let start = token.location.start;
        let end = token.location.end;
        output.push_str(&query[last..start]);

        let is_key = matches!(token.kind, TokenKind::Word(_) | TokenKind::Quoted { .. })
            && tokens.get(i + 1).is_some_and(|next| {
                matches!(next.kind, TokenKind::Comparator(_)) && next.location.start == end
            });
        let style = match &token.kind {
            _ if is_key => colors::CYAN,
            TokenKind::Comparator(_) => colors::YELLOW,
            TokenKind::And | TokenKind::Or | TokenKind::Not => colors::MAGENTA,
            TokenKind::Quoted { .. } => colors::GREEN,
            TokenKind::LParen
            | TokenKind::RParen
            | TokenKind::LBracket
            | TokenKind::RBracket => colors::DIM,
            TokenKind::Word(_) => "",
        };

        let text = &query[start..end];
        if style.is_empty() {
            output.push_str(text);
        } else {
            output.push_str(style);
            output.push_str(text);
            output.push_str(colors::RESET);
        }
        last = end;
    }
    output.push_str(&query[last..]);
    output
}

/// Formats a header with bold cyan styling.
pub fn header(text: &str) -> String {
    format!("{}{}{}{}", colors::BOLD, colors::CYAN, text, colors::RESET)
}

/// Formats text as dimmed/less important.
pub fn dim(text: &str) -> String {
    format!("{}{}{}", colors::DIM, text, colors::RESET)
}

/// Formats text as a success message (green).
pub fn success(text: &str) -> String {
    format!("{}{}{}", colors::GREEN, text, colors::RESET)
}

/// Formats text as a warning (yellow).
pub fn warning(text: &str) -> String {
    format!("{}{}{}", colors::YELLOW, text, colors::RESET)
}

/// Formats text as an error (red).
pub fn error(text: &str) -> String {
    format!("{}{}{}", colors::RED, text, colors::RESET)
}

/// Removes ANSI escape sequences.
pub fn strip_ansi(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // CSI sequences end at the first letter.
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            output.push(c);
        }
    }
    output
}

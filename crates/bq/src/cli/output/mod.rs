//! Rendering and JSON serialization for CLI output.

use std::process::ExitCode;

use bq_highlight::highlight_query;
pub use bq_highlight::{dim, error, header, success, warning};
use bq_query::SyntaxError;
use serde::Serialize;

use crate::cli::context::CommandContext;

/// Applies a style helper unless output is plain.
pub fn paint(ctx: &CommandContext, style: fn(&str) -> String, text: &str) -> String {
    if ctx.plain {
        text.to_string()
    } else {
        style(text)
    }
}

/// Prints a value as pretty JSON, highlighted unless output is plain.
pub fn print_json<T: Serialize>(ctx: &CommandContext, value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            match ctx.highlighter() {
                Some(hl) => println!("{}", hl.highlight_json(&json)),
                None => println!("{json}"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize JSON: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Prints TOML, highlighted unless output is plain.
pub fn print_toml(ctx: &CommandContext, toml: &str) {
    match ctx.highlighter() {
        Some(hl) => print!("{}", hl.highlight_toml(toml)),
        None => print!("{toml}"),
    }
}

/// Returns the query with token coloring unless output is plain.
pub fn styled_query(ctx: &CommandContext, query: &str) -> String {
    if ctx.plain {
        query.to_string()
    } else {
        highlight_query(query)
    }
}

/// Reports a syntax error with a caret under the offending column.
pub fn report_syntax_error(ctx: &CommandContext, query: &str, err: &SyntaxError) -> ExitCode {
    let rendered = err.format_with_context(query);
    let mut lines = rendered.lines();
    if let Some(first) = lines.next() {
        eprintln!("{}", paint(ctx, error, &format!("error: {first}")));
    }
    for line in lines {
        if line.starts_with("hint:") {
            eprintln!("{}", paint(ctx, dim, line));
        } else {
            eprintln!("{line}");
        }
    }
    ExitCode::FAILURE
}

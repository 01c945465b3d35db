//! Implementation of `bq complete`.

use std::process::ExitCode;

use bq_query::{Completion, autocomplete};

use crate::cli::{
    args::CompleteCommand,
    context::CommandContext,
    output::{dim, error, paint, print_json},
};

/// Shows what an editor should offer at the cursor.
pub fn run(ctx: &CommandContext, cmd: &CompleteCommand) -> ExitCode {
    let cursor = cmd.cursor.unwrap_or_else(|| default_cursor(&cmd.query));
    let completion = autocomplete(&cmd.query, cursor);

    if cmd.json {
        return print_json(ctx, &completion);
    }

    match completion {
        Completion::Initial => println!("{}", paint(ctx, dim, "nothing typed yet")),
        Completion::None => println!("{}", paint(ctx, dim, "no completion at cursor")),
        Completion::Error { column, message } => {
            println!("{}", paint(ctx, error, &format!("column {column}: {message}")));
        }
        Completion::FieldName {
            prefix,
            has_value,
            prefix_type,
        } => {
            println!("field name: {prefix}");
            println!("  match: {prefix_type}");
            println!("  has value: {has_value}");
        }
        Completion::FieldValue {
            key,
            prefix,
            prefix_type,
        } => {
            println!("field value: {prefix}");
            println!("  field: {}", key.as_deref().unwrap_or("(any)"));
            println!("  match: {prefix_type}");
        }
    }
    ExitCode::SUCCESS
}

/// Byte offset of the last non-whitespace character, so the cursor sits on the final token.
fn default_cursor(query: &str) -> usize {
    query
        .trim_end()
        .char_indices()
        .next_back()
        .map_or(0, |(idx, _)| idx)
}

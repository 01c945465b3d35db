//! Implementation of `bq validate`.

use std::process::ExitCode;

use bq_query::{parse, validate};
use comfy_table::{Cell, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;

use crate::cli::{
    args::ValidateCommand,
    context::CommandContext,
    output::{dim, paint, print_json, report_syntax_error, success, warning},
};

/// JSON output for `bq validate`.
#[derive(Serialize)]
struct ValidateOutput {
    /// True when every field key is known.
    valid: bool,
    /// Unknown keys with their use counts, in first-seen order.
    invalid_keys: Vec<KeyCount>,
}

/// An unknown key and how many tags use it.
#[derive(Serialize)]
struct KeyCount {
    /// The field key.
    key: String,
    /// Number of tags using it.
    count: usize,
}

/// Checks a query's field keys against the configured schema.
pub fn run(ctx: &CommandContext, cmd: &ValidateCommand) -> ExitCode {
    let expr = match parse(&cmd.query) {
        Ok(expr) => expr,
        Err(e) => return report_syntax_error(ctx, &cmd.query, &e),
    };

    let invalid = expr
        .as_ref()
        .map(|expr| validate(expr, &ctx.config.valid_keys()))
        .unwrap_or_default();
    let counts = count_keys(invalid);
    let valid = counts.is_empty();

    if cmd.json {
        let code = print_json(
            ctx,
            &ValidateOutput {
                valid,
                invalid_keys: counts,
            },
        );
        return if valid { code } else { ExitCode::FAILURE };
    }

    if valid {
        println!("{}", paint(ctx, success, "All field keys are valid."));
        return ExitCode::SUCCESS;
    }

    if ctx.config.schema.is_empty() {
        println!(
            "{}",
            paint(ctx, dim, "No schema keys configured; add [schema] keys to .bq.toml")
        );
    }
    println!(
        "{}",
        paint(ctx, warning, &format!("Unknown field keys ({}):", counts.len()))
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Key", "Uses"]);
    for kc in &counts {
        table.add_row(vec![Cell::new(&kc.key), Cell::new(kc.count.to_string())]);
    }
    println!("{table}");

    ExitCode::FAILURE
}

/// Collapses repeated keys, keeping first-seen order.
fn count_keys(keys: Vec<String>) -> Vec<KeyCount> {
    let mut counts: Vec<KeyCount> = Vec::new();
    for key in keys {
        match counts.iter_mut().find(|kc| kc.key == key) {
            Some(kc) => kc.count += 1,
            None => counts.push(KeyCount { key, count: 1 }),
        }
    }
    counts
}

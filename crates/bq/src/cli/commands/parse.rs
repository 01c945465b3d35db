//! Implementation of `bq parse`.

use std::process::ExitCode;

use bq_query::parse;

use crate::cli::{
    args::ParseCommand,
    context::CommandContext,
    output::{dim, header, paint, print_json, report_syntax_error, styled_query},
};

/// Parses a query and prints its syntax tree.
pub fn run(ctx: &CommandContext, cmd: &ParseCommand) -> ExitCode {
    let expr = match parse(&cmd.query) {
        Ok(expr) => expr,
        Err(e) => return report_syntax_error(ctx, &cmd.query, &e),
    };

    if cmd.json {
        return print_json(ctx, &expr);
    }

    let Some(expr) = expr else {
        println!("{}", paint(ctx, dim, "(empty query: matches everything)"));
        return ExitCode::SUCCESS;
    };

    println!("{} {}", paint(ctx, header, "Query:"), styled_query(ctx, &cmd.query));
    println!(
        "{} {}",
        paint(ctx, header, "Normalized:"),
        styled_query(ctx, &expr.to_query_string())
    );
    println!();
    print!("{expr}");
    ExitCode::SUCCESS
}

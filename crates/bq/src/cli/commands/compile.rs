//! Implementation of `bq compile`.

use std::process::ExitCode;

use bq_filter::{CompileInfo, Filter, TagResolver};
use bq_query::parse;
use serde::Serialize;
use tracing::debug;

use crate::cli::{
    args::CompileCommand,
    context::CommandContext,
    output::{error, paint, print_json, report_syntax_error},
};

/// JSON output for `bq compile --info`.
#[derive(Serialize)]
struct CompileOutput<'a> {
    /// The compiled filter tree.
    filter: &'a Filter,
    /// Whether the query searched `binary.tag`.
    binary_tag_used: bool,
    /// Whether the query searched `feature.tag`.
    feature_tag_used: bool,
}

/// Compiles a query and prints the filter tree as JSON.
pub fn run(ctx: &CommandContext, cmd: &CompileCommand) -> ExitCode {
    let expr = match parse(&cmd.query) {
        Ok(expr) => expr,
        Err(e) => return report_syntax_error(ctx, &cmd.query, &e),
    };

    let compiler = ctx.compiler();
    let resolver = ctx.config.tag_resolver();
    let compiled = if cmd.no_resolve {
        compiler.compile_deferred(expr.as_ref())
    } else {
        compiler.compile(expr.as_ref(), Some(&resolver as &dyn TagResolver))
    };

    let (filter, info) = match compiled {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("{}", paint(ctx, error, &format!("error: {e}")));
            return ExitCode::FAILURE;
        }
    };
    debug!(unresolved = filter.has_lookups(), "compiled filter");

    if cmd.info {
        let CompileInfo {
            binary_tag_used,
            feature_tag_used,
        } = info;
        return print_json(
            ctx,
            &CompileOutput {
                filter: &filter,
                binary_tag_used,
                feature_tag_used,
            },
        );
    }

    print_json(ctx, &filter)
}

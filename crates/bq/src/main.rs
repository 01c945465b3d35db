//! Command-line interface for the `bq` query tool.

use std::{io, process::ExitCode};

use bq::cli::{
    CommandContext,
    args::{Cli, parse_cli},
    commands,
};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("BQ_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let Cli { plain, command } = parse_cli();

    let ctx = if command.needs_config() {
        CommandContext::load(plain)
    } else {
        CommandContext::load_cwd_only(plain)
    };
    match ctx {
        Ok(ctx) => commands::run(&command, &ctx),
        Err(code) => code,
    }
}

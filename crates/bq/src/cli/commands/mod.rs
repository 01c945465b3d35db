//! Command implementations and dispatch.

pub mod check;
pub mod compile;
pub mod complete;
pub mod config;
pub mod init;
pub mod parse;
pub mod validate;

use std::process::ExitCode;

use super::{args::Commands, context::CommandContext};

/// Dispatches to the selected subcommand.
pub fn run(command: &Commands, ctx: &CommandContext) -> ExitCode {
    match command {
        Commands::Parse(cmd) => parse::run(ctx, cmd),
        Commands::Compile(cmd) => compile::run(ctx, cmd),
        Commands::Complete(cmd) => complete::run(ctx, cmd),
        Commands::Validate(cmd) => validate::run(ctx, cmd),
        Commands::Init(cmd) => init::run(ctx, cmd),
        Commands::Config => config::run(ctx),
        Commands::Check => check::run(ctx),
    }
}

//! Implementation of `bq config`.

use std::process::ExitCode;

use crate::cli::{
    context::CommandContext,
    output::{dim, error, paint, print_toml},
};

/// Shows effective configuration settings and the files they came from.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let config = &ctx.config;
    let toml = match config.settings_to_toml() {
        Ok(toml) => toml,
        Err(e) => {
            eprintln!("{}", paint(ctx, error, &format!("error: {e}")));
            return ExitCode::FAILURE;
        }
    };

    if config.sources.is_empty() {
        println!("{}", paint(ctx, dim, "# no configuration files found; showing defaults"));
    } else {
        for path in &config.sources {
            println!("{}", paint(ctx, dim, &format!("# from {}", path.display())));
        }
    }
    println!();
    print_toml(ctx, &toml);
    ExitCode::SUCCESS
}

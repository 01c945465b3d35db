//! Implementation of `bq check`.

use std::process::ExitCode;

use bq_config::ConfigWarning;

use crate::cli::{
    context::CommandContext,
    output::{dim, header, paint, warning},
};

/// Shows configuration files, schema size, and validation warnings.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let config = &ctx.config;

    if config.sources.is_empty() {
        println!("{}", paint(ctx, dim, "No configuration files found."));
        println!();
        println!("Run {} to create a configuration file.", paint(ctx, header, "bq init"));
        println!();
    } else {
        println!("{}", paint(ctx, header, "Config files:"));
        for path in &config.sources {
            println!("   {}", path.display());
        }
        println!();
    }

    println!("{}", paint(ctx, header, "Summary:"));
    println!("   schema keys:  {}", config.schema.len());
    println!("   binary tags:  {}", config.tags.binary.len());
    println!("   feature tags: {}", config.tags.feature.len());
    println!();

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("No issues found.");
        return ExitCode::SUCCESS;
    }

    println!(
        "{}",
        paint(ctx, header, &format!("Warnings ({}):", warnings.len()))
    );
    for w in &warnings {
        println!("   {}", paint(ctx, warning, &w.to_string()));
    }
    println!();

    print_hints(ctx, &warnings);

    ExitCode::FAILURE
}

/// Prints hints for resolving common warnings.
fn print_hints(ctx: &CommandContext, warnings: &[ConfigWarning]) {
    for w in warnings {
        let hint = match w {
            ConfigWarning::EmptySchema => "Hint: list field keys under [schema] keys in .bq.toml",
            ConfigWarning::EmptyTag { .. } => "Hint: add values to the tag or remove it",
            ConfigWarning::BlankFieldName { .. } | ConfigWarning::DuplicatePrefixField { .. } => {
                continue;
            }
        };
        println!("{}", paint(ctx, dim, hint));
    }
}

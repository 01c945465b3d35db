//! Clap argument definitions for the `bq` CLI.

use std::{env, process::exit};

use clap::{Args, CommandFactory, Parser, Subcommand, error::ErrorKind};

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "bq")]
#[command(about = "Binary query tools - parse, compile and check metadata search queries")]
pub struct Cli {
    /// Disable colors and syntax highlighting
    #[arg(long, global = true)]
    pub plain: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments for `bq parse`.
#[derive(Args, Debug, Clone)]
pub struct ParseCommand {
    /// Query to parse
    pub query: String,

    /// Output the syntax tree as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `bq compile`.
#[derive(Args, Debug, Clone)]
pub struct CompileCommand {
    /// Query to compile
    pub query: String,

    /// Leave tag searches as unresolved lookups
    #[arg(long)]
    pub no_resolve: bool,

    /// Also report which tag searches the query uses
    #[arg(long)]
    pub info: bool,
}

/// Arguments for `bq complete`.
#[derive(Args, Debug, Clone)]
pub struct CompleteCommand {
    /// Partially typed query
    pub query: String,

    /// Cursor byte offset [default: last character]
    #[arg(short = 'c', long)]
    pub cursor: Option<usize>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `bq validate`.
#[derive(Args, Debug, Clone)]
pub struct ValidateCommand {
    /// Query to check
    pub query: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `bq init`.
#[derive(Args, Debug, Clone)]
pub struct InitCommand {
    /// Create global ~/.bq.toml instead
    #[arg(long)]
    pub global: bool,

    /// Overwrite existing configuration file
    #[arg(long)]
    pub force: bool,
}

/// Supported `bq` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Parse a query and show its syntax tree
    #[command(after_help = "\
QUERY SYNTAX:
  deadbeef            Search hashes and names (global search)
  key:value           Field match (case-insensitive unless \"double quoted\")
  key:=value          Exact, case-sensitive match
  key:>n key:>=n      Comparisons (also :< and :<=)
  key:[1 TO 10)       Range; [ ] inclusive, ( ) exclusive
  key:prefix*         Prefix match
  key:                Field exists
  a AND b, a OR b     Boolean logic; adjacent terms are ANDed
  NOT a, !a           Negation
  (expr)              Grouping

Numbers accept size units: 10kb, 2mib, 1.5gb.

EXAMPLES:
  bq parse 'file_format:pe AND size:>1mb'
  bq parse --json 'filename:setup* OR !signed:'")]
    Parse(ParseCommand),

    /// Compile a query into a filter tree
    Compile(CompileCommand),

    /// Show completion context at a cursor position
    Complete(CompleteCommand),

    /// Report field keys not in the configured schema
    Validate(ValidateCommand),

    /// Initialize bq configuration in current directory
    Init(InitCommand),

    /// Show effective configuration settings
    Config,

    /// Validate configuration and diagnose issues
    Check,
}

impl Commands {
    /// Returns true if the command reads `.bq.toml` files.
    pub fn needs_config(&self) -> bool {
        matches!(
            self,
            Self::Compile(_) | Self::Validate(_) | Self::Config | Self::Check
        )
    }
}

/// Parses CLI arguments, printing compact help for top-level `--help`.
pub fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if e.kind() == ErrorKind::DisplayHelp {
                let args: Vec<_> = env::args().collect();
                if args.len() <= 2 {
                    print_command_help();
                    exit(0);
                }
            }
            e.exit();
        }
    }
}

/// Prints help listing each subcommand on one line.
fn print_command_help() {
    let cmd = Cli::command();
    let about = cmd.get_about().map(|s| s.to_string()).unwrap_or_default();

    println!("{about}");
    println!();
    println!("Usage: bq [--plain] <COMMAND>");
    println!();
    println!("Commands:");

    for sub in cmd.get_subcommands() {
        let name = sub.get_name();
        if name == "help" {
            continue;
        }
        let about = sub.get_about().map(|s| s.to_string()).unwrap_or_default();
        println!("  {name:10} {about}");
    }

    println!(
        "  {:<10} Print this message or the help of the given subcommand(s)",
        "help"
    );
    println!();
    println!("Options:");
    println!("      --plain  Disable colors and syntax highlighting");
    println!("  -h, --help   Print help");
    println!();
    println!("Set BQ_LOG (e.g. BQ_LOG=debug) to enable diagnostic logging on stderr.");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn plain_is_global() {
        let cli = parse(&["bq", "parse", "x", "--plain"]);
        assert!(cli.plain);
        assert!(matches!(cli.command, Commands::Parse(_)));
    }

    #[test]
    fn complete_cursor_is_optional() {
        let Commands::Complete(cmd) = parse(&["bq", "complete", "size:1"]).command else {
            panic!("expected complete");
        };
        assert!(cmd.cursor.is_none());

        let Commands::Complete(cmd) = parse(&["bq", "complete", "size:1", "-c", "2"]).command
        else {
            panic!("expected complete");
        };
        assert_eq!(cmd.cursor, Some(2));
    }

    #[test]
    fn compile_flags() {
        let Commands::Compile(cmd) =
            parse(&["bq", "compile", "binary.tag:x", "--no-resolve", "--info"]).command
        else {
            panic!("expected compile");
        };
        assert!(cmd.no_resolve);
        assert!(cmd.info);
    }

    #[test]
    fn query_is_required() {
        assert!(Cli::try_parse_from(["bq", "validate"]).is_err());
    }

    #[test]
    fn config_commands_need_config() {
        assert!(parse(&["bq", "check"]).command.needs_config());
        assert!(parse(&["bq", "validate", "x"]).command.needs_config());
        assert!(!parse(&["bq", "parse", "x"]).command.needs_config());
        assert!(!parse(&["bq", "init"]).command.needs_config());
    }
}

//! Shared context for running CLI commands.

use std::{
    env,
    path::{Path, PathBuf},
    process::ExitCode,
};

use bq_config::Config;
use bq_filter::Compiler;
use bq_highlight::Highlighter;
use tracing::debug;

/// Command execution context built once per CLI invocation.
pub struct CommandContext {
    /// Current working directory.
    pub cwd: PathBuf,
    /// Loaded configuration (may be default if no config files found).
    pub config: Config,
    /// Whether output is uncolored.
    pub plain: bool,
}

impl CommandContext {
    /// Loads the current directory and configuration.
    pub fn load(plain: bool) -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        let config = load_config_or_failure(&cwd)?;
        Ok(Self { cwd, config, plain })
    }

    /// Loads only the current directory, skipping configuration parsing.
    ///
    /// Used for commands like `init` and `parse` that should work even when an existing config
    /// file is invalid.
    pub fn load_cwd_only(plain: bool) -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        Ok(Self {
            cwd,
            config: Config::default(),
            plain,
        })
    }

    /// Builds a compiler targeting the configured fields.
    pub fn compiler(&self) -> Compiler {
        Compiler::new(self.config.search_fields())
    }

    /// Returns a highlighter, or `None` for plain output.
    pub fn highlighter(&self) -> Option<Highlighter> {
        (!self.plain).then(Highlighter::new)
    }
}

/// Returns the current working directory or exits with a consistent error.
fn current_dir_or_failure() -> Result<PathBuf, ExitCode> {
    env::current_dir().map_err(|e| {
        eprintln!("error: could not determine current directory: {e}");
        ExitCode::FAILURE
    })
}

/// Loads configuration from the provided directory or exits with an error.
fn load_config_or_failure(cwd: &Path) -> Result<Config, ExitCode> {
    let config = Config::load(cwd).map_err(|e| {
        eprintln!("error: failed to load configuration: {e}");
        ExitCode::FAILURE
    })?;
    debug!(
        files = config.sources.len(),
        schema_keys = config.schema.len(),
        binary_tags = config.tags.binary.len(),
        feature_tags = config.tags.feature.len(),
        "loaded configuration"
    );
    Ok(config)
}

//! Locating `.bq.toml` files.
//!
//! Project files are found in the working directory and its ancestors. The user's
//! `~/.bq.toml` sits below all of them in precedence.

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::parse::is_root_config;

/// The configuration filename.
pub const CONFIG_FILENAME: &str = ".bq.toml";

/// Discovers all configuration files relevant to the given directory.
///
/// Returns paths closest to `cwd` first with `~/.bq.toml` last. A file with `root = true`
/// ends the list, and the global file is then left out.
pub fn discover_config_files(cwd: &Path) -> Vec<PathBuf> {
    discover_with_home(cwd, home_dir().as_deref())
}

/// Discovery against an explicit home directory.
fn discover_with_home(cwd: &Path, home: Option<&Path>) -> Vec<PathBuf> {
    let mut configs = Vec::new();
    for path in cwd.ancestors().map(|dir| dir.join(CONFIG_FILENAME)) {
        if !path.is_file() {
            continue;
        }
        let stop = is_root_config(&path);
        configs.push(path);
        if stop {
            return configs;
        }
    }

    let global = home
        .map(|home| home.join(CONFIG_FILENAME))
        .filter(|path| path.is_file() && !configs.contains(path));
    configs.extend(global);
    configs
}

/// The user's home directory, if the platform reports one.
fn home_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Path of the global configuration file (`~/.bq.toml`), or `None` without a home directory.
pub fn global_config_path() -> Option<PathBuf> {
    home_dir().map(|home| home.join(CONFIG_FILENAME))
}

/// Checks if a path is the global configuration file.
pub fn is_global_config(path: &Path) -> bool {
    global_config_path().is_some_and(|global| path == global)
}

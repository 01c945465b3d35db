//! Configuration file parsing.
//!
//! Parses individual `.bq.toml` files into intermediate `RawConfig` structures
//! that preserve the optional nature of all fields before merging.

use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_with::{OneOrMany, serde_as};
#[cfg(test)]
use toml::de::Error as TomlError;

use crate::ConfigError;

/// Raw configuration as parsed directly from a TOML file.
///
/// All fields are optional to support partial configs that will be merged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// When true, stop discovery here - ignore parent and global configs.
    pub root: Option<bool>,
    /// Search field names.
    pub fields: Option<RawFields>,
    /// Known field keys.
    pub schema: Option<RawSchema>,
    /// Static tag tables.
    pub tags: Option<RawTags>,
}

/// Raw `[fields]` section.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFields {
    /// Primary identifier field.
    pub primary_id: Option<String>,
    /// Boost on an exact primary id match.
    pub primary_id_boost: Option<f32>,
    /// Hash fields matched by lowercased prefix. A single string or a list.
    #[serde_as(as = "Option<OneOrMany<_>>")]
    pub hash_prefix: Option<Vec<String>>,
    /// Fuzzy hash field.
    pub fuzzy_hash: Option<String>,
    /// Fields matched by prefix as typed. A single string or a list.
    #[serde_as(as = "Option<OneOrMany<_>>")]
    pub case_sensitive_prefix: Option<Vec<String>>,
    /// Object field holding feature values.
    pub features_map: Option<String>,
}

/// Raw `[schema]` section.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSchema {
    /// Field keys. A single string or a list.
    #[serde_as(as = "Option<OneOrMany<_>>")]
    pub keys: Option<Vec<String>>,
}

/// Raw `[tags]` section.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTags {
    /// Binary tag name to primary ids. Each value is a single id or a list.
    #[serde_as(as = "Option<HashMap<_, OneOrMany<_>>>")]
    pub binary: Option<HashMap<String, Vec<String>>>,
    /// Feature tag name to feature values. Each value is a single table or a list.
    #[serde_as(as = "Option<HashMap<_, OneOrMany<_>>>")]
    pub feature: Option<HashMap<String, Vec<FeatureValue>>>,
}

/// A feature name/value pair labelled by a feature tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
pub struct FeatureValue {
    /// Feature name, a subfield of the features map.
    pub name: String,
    /// Feature value.
    pub value: String,
}

/// Parses a configuration file from disk.
///
/// Returns a `RawConfig` with all fields as optionals, ready for merging.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string.
///
/// The `path` parameter is used for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses configuration from a TOML string without path context.
#[cfg(test)]
pub fn parse_config(contents: &str) -> Result<RawConfig, TomlError> {
    toml::from_str(contents)
}

/// Checks if a config file has `root = true` set.
///
/// Returns false if the file cannot be read or parsed.
pub fn is_root_config(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    let Ok(config) = toml::from_str::<RawConfig>(&contents) else {
        return false;
    };
    config.root == Some(true)
}

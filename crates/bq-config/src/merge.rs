//! Configuration merging.
//!
//! Merges multiple `RawConfig` files into a single resolved `Config`, applying precedence
//! rules.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use crate::{
    Config, ConfigError, FieldSettings, TagTables,
    parse::{RawConfig, RawFields},
};

/// A parsed config file with its source path.
#[derive(Debug)]
pub struct ParsedConfig {
    /// Path to the config file.
    pub path: PathBuf,
    /// Parsed raw configuration.
    pub config: RawConfig,
}

/// Merges multiple configuration files into a single resolved `Config`.
///
/// Configs should be provided in precedence order: highest precedence first (closest to CWD),
/// lowest precedence last (global config).
///
/// Merge rules:
/// - Field settings: first defined value wins (highest precedence)
/// - Schema keys: union of every file
/// - Tags: merged by name per table, first definition wins completely
pub fn merge_configs(configs: &[ParsedConfig]) -> Result<Config, ConfigError> {
    if configs.is_empty() {
        return Ok(Config::default());
    }

    let fields = merge_fields(configs);
    let schema = merge_schema(configs);
    let tags = merge_tags(configs);
    let sources = configs.iter().map(|c| c.path.clone()).collect();
    let config_root = configs
        .first()
        .and_then(|c| c.path.parent())
        .map(Path::to_path_buf);

    Ok(Config {
        fields,
        schema,
        tags,
        sources,
        config_root,
    })
}

/// Merges field settings, taking first defined value for each field.
fn merge_fields(configs: &[ParsedConfig]) -> FieldSettings {
    let mut result = FieldSettings::default();

    // Lowest precedence first so closer files overwrite.
    for parsed in configs.iter().rev() {
        if let Some(ref fields) = parsed.config.fields {
            apply_raw_fields(&mut result, fields);
        }
    }

    result
}

/// Applies raw field settings to result, overwriting any present values.
fn apply_raw_fields(result: &mut FieldSettings, raw: &RawFields) {
    if let Some(ref v) = raw.primary_id {
        result.primary_id = v.clone();
    }
    if let Some(v) = raw.primary_id_boost {
        result.primary_id_boost = v;
    }
    if let Some(ref v) = raw.hash_prefix {
        result.hash_prefix = v.clone();
    }
    if let Some(ref v) = raw.fuzzy_hash {
        result.fuzzy_hash = v.clone();
    }
    if let Some(ref v) = raw.case_sensitive_prefix {
        result.case_sensitive_prefix = v.clone();
    }
    if let Some(ref v) = raw.features_map {
        result.features_map = v.clone();
    }
}

/// Collects schema keys from every config.
fn merge_schema(configs: &[ParsedConfig]) -> BTreeSet<String> {
    configs
        .iter()
        .filter_map(|parsed| parsed.config.schema.as_ref())
        .filter_map(|schema| schema.keys.as_ref())
        .flatten()
        .cloned()
        .collect()
}

/// Merges tag tables. The first config defining a tag name supplies all of its values.
fn merge_tags(configs: &[ParsedConfig]) -> TagTables {
    let mut binary = BTreeMap::new();
    let mut feature = BTreeMap::new();

    for parsed in configs {
        let Some(ref tags) = parsed.config.tags else {
            continue;
        };
        for (name, ids) in tags.binary.iter().flatten() {
            binary.entry(name.clone()).or_insert_with(|| ids.clone());
        }
        for (name, values) in tags.feature.iter().flatten() {
            feature.entry(name.clone()).or_insert_with(|| values.clone());
        }
    }

    TagTables { binary, feature }
}

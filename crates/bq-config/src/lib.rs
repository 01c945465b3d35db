//! Configuration system for bq.
//!
//! bq uses TOML configuration files named `.bq.toml`. Configuration is resolved by walking up
//! the directory tree from the current working directory, collecting any `.bq.toml` files found,
//! then loading `~/.bq.toml` as the global config with lowest precedence.
//!
//! A configuration names the document fields the query compiler targets, the field keys the
//! validator accepts, and static tables for the `binary.tag` and `feature.tag` searches.

#![warn(missing_docs)]

mod discovery;
mod error;
mod merge;
mod parse;
mod templates;
#[cfg(test)]
mod test_support;
mod validate;

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    path::{Path, PathBuf},
};

use bq_filter::{
    DEFAULT_CASE_SENSITIVE_PREFIX, DEFAULT_FEATURES_MAP, DEFAULT_FUZZY_HASH, DEFAULT_HASH_PREFIX,
    DEFAULT_PRIMARY_ID, DEFAULT_PRIMARY_ID_BOOST, MAGIC_KEYS, SearchFields, StaticTagResolver,
};
pub use discovery::{CONFIG_FILENAME, discover_config_files, global_config_path, is_global_config};
pub use error::ConfigError;
pub use merge::{ParsedConfig, merge_configs};
pub use parse::{
    FeatureValue, RawConfig, RawFields, RawSchema, RawTags, parse_config_file, parse_config_str,
};
use serde::{Deserialize, Serialize};
pub use templates::{global_template, local_template};
pub use validate::ConfigWarning;
use validate::validate_config;

/// Top-level merged configuration for bq.
///
/// This represents the fully resolved configuration after merging all discovered `.bq.toml`
/// files according to precedence rules.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Document field names.
    pub fields: FieldSettings,
    /// Known field keys, combined across all files.
    pub schema: BTreeSet<String>,
    /// Static tag tables.
    pub tags: TagTables,
    /// Files that contributed, highest precedence first.
    pub sources: Vec<PathBuf>,
    /// Directory containing the most specific config file.
    pub config_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration by discovering and merging all relevant `.bq.toml` files.
    ///
    /// This is the main entry point for loading configuration. It:
    /// 1. Discovers all `.bq.toml` files from `cwd` up to the filesystem root
    /// 2. Appends `~/.bq.toml` if it exists
    /// 3. Parses each file
    /// 4. Merges them according to precedence rules (closest to `cwd` wins)
    ///
    /// Returns `Ok(Config::default())` if no configuration files are found.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        let config_files = discover_config_files(cwd);
        Self::load_from_files(&config_files)
    }

    /// Loads configuration from a specific list of config file paths.
    ///
    /// Files should be provided in precedence order: highest precedence first.
    pub fn load_from_files(files: &[PathBuf]) -> Result<Self, ConfigError> {
        if files.is_empty() {
            return Ok(Self::default());
        }

        let parsed: Vec<ParsedConfig> = files
            .iter()
            .map(|path| {
                let config = parse_config_file(path)?;
                Ok(ParsedConfig {
                    path: path.clone(),
                    config,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        merge_configs(&parsed)
    }

    /// Validates the configuration and returns any warnings.
    ///
    /// This checks for:
    /// - An empty schema
    /// - Blank field names
    /// - Fields listed more than once for global prefix search
    /// - Tags defined with no values
    pub fn validate(&self) -> Vec<ConfigWarning> {
        validate_config(self)
    }

    /// Field names for the query compiler.
    pub fn search_fields(&self) -> SearchFields {
        SearchFields::from(&self.fields)
    }

    /// Keys accepted by query validation: the schema plus the magic tag keys.
    pub fn valid_keys(&self) -> HashSet<String> {
        self.schema
            .iter()
            .cloned()
            .chain(MAGIC_KEYS.iter().map(|k| k.to_string()))
            .collect()
    }

    /// Builds a resolver answering tag searches from the `[tags]` tables.
    pub fn tag_resolver(&self) -> StaticTagResolver {
        let binary = self
            .tags
            .binary
            .iter()
            .map(|(tag, ids)| (tag.clone(), ids.clone()))
            .collect();
        let feature = self
            .tags
            .feature
            .iter()
            .map(|(tag, values)| {
                let pairs = values
                    .iter()
                    .map(|v| (v.name.clone(), v.value.clone()))
                    .collect();
                (tag.clone(), pairs)
            })
            .collect();
        StaticTagResolver::new(binary, feature)
    }

    /// Serializes the effective configuration to TOML format.
    ///
    /// The output has the same layout as a `.bq.toml` file. Tables are sorted for deterministic
    /// output.
    pub fn settings_to_toml(&self) -> Result<String, ConfigError> {
        let serializable = SerializableConfig {
            fields: &self.fields,
            schema: SerializableSchema { keys: &self.schema },
            tags: &self.tags,
        };
        Ok(toml::to_string_pretty(&serializable)?)
    }
}

/// Document field names, as set in `[fields]`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FieldSettings {
    /// Primary identifier field.
    pub primary_id: String,
    /// Boost on an exact primary id match.
    pub primary_id_boost: f32,
    /// Hash fields matched by lowercased prefix.
    pub hash_prefix: Vec<String>,
    /// Fuzzy hash field.
    pub fuzzy_hash: String,
    /// Fields matched by prefix as typed.
    pub case_sensitive_prefix: Vec<String>,
    /// Object field holding feature values.
    pub features_map: String,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            primary_id: DEFAULT_PRIMARY_ID.to_string(),
            primary_id_boost: DEFAULT_PRIMARY_ID_BOOST,
            hash_prefix: DEFAULT_HASH_PREFIX.iter().map(|s| s.to_string()).collect(),
            fuzzy_hash: DEFAULT_FUZZY_HASH.to_string(),
            case_sensitive_prefix: DEFAULT_CASE_SENSITIVE_PREFIX
                .iter()
                .map(|s| s.to_string())
                .collect(),
            features_map: DEFAULT_FEATURES_MAP.to_string(),
        }
    }
}

impl From<&FieldSettings> for SearchFields {
    fn from(fields: &FieldSettings) -> Self {
        Self {
            primary_id: fields.primary_id.clone(),
            primary_id_boost: fields.primary_id_boost,
            hash_prefix: fields.hash_prefix.clone(),
            fuzzy_hash: fields.fuzzy_hash.clone(),
            case_sensitive_prefix: fields.case_sensitive_prefix.clone(),
            features_map: fields.features_map.clone(),
        }
    }
}

/// Static tag definitions, as set in `[tags.binary]` and `[tags.feature]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TagTables {
    /// Binary tag name to primary ids.
    pub binary: BTreeMap<String, Vec<String>>,
    /// Feature tag name to feature name/value pairs.
    pub feature: BTreeMap<String, Vec<FeatureValue>>,
}

/// Internal struct for TOML serialization of the effective configuration.
#[derive(Serialize)]
struct SerializableConfig<'a> {
    /// Field names.
    fields: &'a FieldSettings,
    /// Schema keys.
    schema: SerializableSchema<'a>,
    /// Tag tables.
    tags: &'a TagTables,
}

/// `[schema]` table for serialization.
#[derive(Serialize)]
struct SerializableSchema<'a> {
    /// Sorted keys.
    keys: &'a BTreeSet<String>,
}

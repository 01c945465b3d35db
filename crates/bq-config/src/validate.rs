//! Configuration validation.
//!
//! Validates a loaded configuration and reports warnings for potential issues.

use std::{collections::HashSet, fmt, iter};

use crate::Config;

/// A non-fatal warning about the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// No schema keys are defined, so every field search fails validation.
    EmptySchema,
    /// A field setting is empty or whitespace.
    BlankFieldName {
        /// Setting name, such as `fields.primary_id`.
        setting: String,
    },
    /// A field appears more than once among the global-search prefix fields.
    DuplicatePrefixField {
        /// Field name.
        field: String,
    },
    /// A tag is defined with no values.
    EmptyTag {
        /// Tag table, `binary` or `feature`.
        table: &'static str,
        /// Tag name.
        tag: String,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySchema => {
                write!(f, "no schema keys are defined; every field search will be flagged")
            }
            Self::BlankFieldName { setting } => write!(f, "{setting} is blank"),
            Self::DuplicatePrefixField { field } => {
                write!(f, "field '{field}' is listed more than once for prefix search")
            }
            Self::EmptyTag { table, tag } => {
                write!(f, "{table} tag '{tag}' has no values and will never match")
            }
        }
    }
}

/// Validates the configuration and returns any warnings.
pub fn validate_config(config: &Config) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if config.schema.is_empty() {
        warnings.push(ConfigWarning::EmptySchema);
    }

    warnings.extend(check_field_names(config));
    warnings.extend(check_prefix_duplicates(config));

    for (tag, ids) in &config.tags.binary {
        if ids.is_empty() {
            warnings.push(ConfigWarning::EmptyTag {
                table: "binary",
                tag: tag.clone(),
            });
        }
    }
    for (tag, values) in &config.tags.feature {
        if values.is_empty() {
            warnings.push(ConfigWarning::EmptyTag {
                table: "feature",
                tag: tag.clone(),
            });
        }
    }

    warnings
}

/// Reports blank field names.
fn check_field_names(config: &Config) -> Vec<ConfigWarning> {
    let fields = &config.fields;
    let singles = [
        ("fields.primary_id", &fields.primary_id),
        ("fields.fuzzy_hash", &fields.fuzzy_hash),
        ("fields.features_map", &fields.features_map),
    ];
    let lists = [
        ("fields.hash_prefix", &fields.hash_prefix),
        ("fields.case_sensitive_prefix", &fields.case_sensitive_prefix),
    ];

    let blank_single = singles
        .into_iter()
        .filter(|(_, name)| name.trim().is_empty())
        .map(|(setting, _)| setting);
    let blank_list = lists
        .into_iter()
        .filter(|(_, names)| names.iter().any(|n| n.trim().is_empty()))
        .map(|(setting, _)| setting);

    blank_single
        .chain(blank_list)
        .map(|setting| ConfigWarning::BlankFieldName {
            setting: setting.to_string(),
        })
        .collect()
}

/// Reports fields searched by more than one global prefix clause.
fn check_prefix_duplicates(config: &Config) -> Vec<ConfigWarning> {
    let fields = &config.fields;
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut warnings = Vec::new();

    let prefix_fields = iter::once(&fields.primary_id)
        .chain(&fields.hash_prefix)
        .chain(iter::once(&fields.fuzzy_hash))
        .chain(&fields.case_sensitive_prefix);

    for field in prefix_fields {
        if !seen.insert(field.as_str()) && reported.insert(field.as_str()) {
            warnings.push(ConfigWarning::DuplicatePrefixField {
                field: field.clone(),
            });
        }
    }
    warnings
}

//! Tag lookups for the `binary.tag` and `feature.tag` magic keys.
//!
//! The resolver is supplied by the caller; it typically queries an annotation store. The
//! compiler treats it as a plain fallible call with no retries, timeouts, or caching.

use std::{collections::HashMap, error::Error};

use tracing::debug;

use crate::{
    compile::CompileError,
    filter::{BoolFilter, Filter, FilterValue},
};

/// Error returned by a [`TagResolver`], passed through unchanged.
pub type ResolverError = Box<dyn Error + Send + Sync>;

/// Looks up the concrete values behind magic tag searches.
pub trait TagResolver {
    /// Returns the primary ids of binaries carrying `tag`.
    fn resolve_binary_tag(&self, tag: &str) -> Result<Vec<String>, ResolverError>;

    /// Returns the `(feature name, feature value)` pairs labelled with `tag`.
    fn resolve_feature_tag(&self, tag: &str) -> Result<Vec<(String, String)>, ResolverError>;
}

/// A resolver backed by in-memory tables.
#[derive(Debug, Clone, Default)]
pub struct StaticTagResolver {
    /// Tag name to primary ids.
    binary: HashMap<String, Vec<String>>,
    /// Tag name to feature name/value pairs.
    feature: HashMap<String, Vec<(String, String)>>,
}

impl StaticTagResolver {
    /// Creates a resolver from prebuilt tables.
    pub fn new(
        binary: HashMap<String, Vec<String>>,
        feature: HashMap<String, Vec<(String, String)>>,
    ) -> Self {
        Self { binary, feature }
    }

    /// Adds primary ids for a binary tag.
    pub fn with_binary_tag(mut self, tag: &str, ids: &[&str]) -> Self {
        self.binary
            .entry(tag.to_string())
            .or_default()
            .extend(ids.iter().map(|id| id.to_string()));
        self
    }

    /// Adds a feature name/value pair for a feature tag.
    pub fn with_feature_tag(mut self, tag: &str, name: &str, value: &str) -> Self {
        self.feature
            .entry(tag.to_string())
            .or_default()
            .push((name.to_string(), value.to_string()));
        self
    }
}

impl TagResolver for StaticTagResolver {
    fn resolve_binary_tag(&self, tag: &str) -> Result<Vec<String>, ResolverError> {
        Ok(self.binary.get(tag).cloned().unwrap_or_default())
    }

    fn resolve_feature_tag(&self, tag: &str) -> Result<Vec<(String, String)>, ResolverError> {
        Ok(self.feature.get(tag).cloned().unwrap_or_default())
    }
}

/// Resolves a `binary.tag` search into a terms filter on the primary id field.
pub(crate) fn resolve_binary_tag(
    resolver: &dyn TagResolver,
    tag: &str,
    primary_id_field: &str,
) -> Result<Filter, CompileError> {
    let ids = resolver
        .resolve_binary_tag(tag)
        .map_err(|source| CompileError::Resolver { source })?;
    debug!(tag, matches = ids.len(), "resolved binary tag");

    if ids.is_empty() {
        return Err(CompileError::TagNotFound {
            tag: tag.to_string(),
        });
    }

    Ok(Filter::Terms {
        field: primary_id_field.to_string(),
        values: ids,
    })
}

/// Resolves a `feature.tag` search into a disjunction over feature values.
pub(crate) fn resolve_feature_tag(
    resolver: &dyn TagResolver,
    tag: &str,
    features_map_field: &str,
) -> Result<Filter, CompileError> {
    let pairs = resolver
        .resolve_feature_tag(tag)
        .map_err(|source| CompileError::Resolver { source })?;
    debug!(tag, matches = pairs.len(), "resolved feature tag");

    if pairs.is_empty() {
        return Err(CompileError::FeatureTagNotFound {
            tag: tag.to_string(),
        });
    }

    let should = pairs
        .into_iter()
        .map(|(name, value)| Filter::Term {
            field: format!("{features_map_field}.{name}"),
            value: FilterValue::String(value),
            case_insensitive: false,
            boost: None,
        })
        .collect();

    Ok(Filter::Bool(BoolFilter {
        should,
        minimum_should_match: Some(1),
        ..BoolFilter::default()
    }))
}

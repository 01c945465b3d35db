//! Backend-neutral filter tree.
//!
//! The compiler's output. A separate encoder turns it into a concrete search engine's query
//! language; nothing here knows about any particular engine.

use bq_query::Number;
use serde::Serialize;

use crate::{
    compile::CompileError,
    resolver::{TagResolver, resolve_binary_tag, resolve_feature_tag},
};

/// A literal compared against a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Text.
    String(String),
    /// Whole number.
    Int(i64),
    /// Decimal number.
    Float(f64),
}

impl From<Number> for FilterValue {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(v) => Self::Int(v),
            Number::Float(v) => Self::Float(v),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// Which magic key a deferred lookup came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    /// `binary.tag`: resolves to primary ids.
    BinaryTag,
    /// `feature.tag`: resolves to feature name/value pairs.
    FeatureTag,
}

/// Boolean combination of clauses.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoolFilter {
    /// Clauses that must all match, without scoring.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Filter>,
    /// Clauses that must all match.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Filter>,
    /// Optional clauses; see `minimum_should_match`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Filter>,
    /// Clauses that must not match.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Filter>,
    /// How many `should` clauses must match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<u32>,
}

impl BoolFilter {
    /// Iterates over every clause, in field order.
    fn clauses_mut(&mut self) -> impl Iterator<Item = &mut Filter> {
        self.filter
            .iter_mut()
            .chain(self.must.iter_mut())
            .chain(self.should.iter_mut())
            .chain(self.must_not.iter_mut())
    }
}

/// A node of the compiled filter tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Field equals value.
    Term {
        /// Field name.
        field: String,
        /// Value to match.
        value: FilterValue,
        /// Whether string comparison ignores case.
        case_insensitive: bool,
        /// Score multiplier.
        #[serde(skip_serializing_if = "Option::is_none")]
        boost: Option<f32>,
    },
    /// Field equals any of the values.
    Terms {
        /// Field name.
        field: String,
        /// Accepted values.
        values: Vec<String>,
    },
    /// Field starts with value.
    Prefix {
        /// Field name.
        field: String,
        /// Required prefix.
        value: String,
        /// Whether comparison ignores case.
        case_insensitive: bool,
    },
    /// Field lies within bounds. Absent bounds are open.
    Range {
        /// Field name.
        field: String,
        /// Exclusive lower bound.
        #[serde(skip_serializing_if = "Option::is_none")]
        gt: Option<FilterValue>,
        /// Inclusive lower bound.
        #[serde(skip_serializing_if = "Option::is_none")]
        gte: Option<FilterValue>,
        /// Exclusive upper bound.
        #[serde(skip_serializing_if = "Option::is_none")]
        lt: Option<FilterValue>,
        /// Inclusive upper bound.
        #[serde(skip_serializing_if = "Option::is_none")]
        lte: Option<FilterValue>,
    },
    /// Field is present.
    Exists {
        /// Field name.
        field: String,
    },
    /// Boolean combination.
    Bool(BoolFilter),
    /// Placeholder for a magic-key search awaiting a tag lookup.
    ExternalLookup {
        /// Which lookup to run.
        kind: LookupKind,
        /// Tag name to look up.
        key: String,
    },
}

impl Filter {
    /// A filter matching every document.
    pub fn match_all() -> Self {
        Self::Bool(BoolFilter::default())
    }

    /// Builds a `Range` with only the given bounds set.
    pub(crate) fn range(field: &str) -> RangeBuilder {
        RangeBuilder {
            field: field.to_string(),
            gt: None,
            gte: None,
            lt: None,
            lte: None,
        }
    }

    /// Returns true if any node is still an unresolved [`Filter::ExternalLookup`].
    pub fn has_lookups(&self) -> bool {
        match self {
            Self::ExternalLookup { .. } => true,
            Self::Bool(b) => b
                .filter
                .iter()
                .chain(&b.must)
                .chain(&b.should)
                .chain(&b.must_not)
                .any(Self::has_lookups),
            _ => false,
        }
    }

    /// Replaces every [`Filter::ExternalLookup`] with the filter its tag resolves to.
    ///
    /// Fails on the first lookup that cannot be resolved; the tree is left partially resolved
    /// in that case and should be discarded.
    pub fn resolve_lookups(
        &mut self,
        resolver: Option<&dyn TagResolver>,
        primary_id_field: &str,
        features_map_field: &str,
    ) -> Result<(), CompileError> {
        match self {
            Self::ExternalLookup { kind, key } => {
                let resolver = resolver.ok_or(CompileError::ResolverUnavailable)?;
                *self = match kind {
                    LookupKind::BinaryTag => resolve_binary_tag(resolver, key, primary_id_field)?,
                    LookupKind::FeatureTag => {
                        resolve_feature_tag(resolver, key, features_map_field)?
                    }
                };
                Ok(())
            }
            Self::Bool(b) => {
                for clause in b.clauses_mut() {
                    clause.resolve_lookups(resolver, primary_id_field, features_map_field)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Accumulates bounds for a [`Filter::Range`].
pub(crate) struct RangeBuilder {
    /// Field name.
    field: String,
    /// Exclusive lower bound.
    gt: Option<FilterValue>,
    /// Inclusive lower bound.
    gte: Option<FilterValue>,
    /// Exclusive upper bound.
    lt: Option<FilterValue>,
    /// Inclusive upper bound.
    lte: Option<FilterValue>,
}

impl RangeBuilder {
    /// Sets the lower bound.
    pub(crate) fn lower(mut self, value: FilterValue, inclusive: bool) -> Self {
        if inclusive {
            self.gte = Some(value);
        } else {
            self.gt = Some(value);
        }
        self
    }

    /// Sets the upper bound.
    pub(crate) fn upper(mut self, value: FilterValue, inclusive: bool) -> Self {
        if inclusive {
            self.lte = Some(value);
        } else {
            self.lt = Some(value);
        }
        self
    }

    /// Finishes the filter.
    pub(crate) fn build(self) -> Filter {
        Filter::Range {
            field: self.field,
            gt: self.gt,
            gte: self.gte,
            lt: self.lt,
            lte: self.lte,
        }
    }
}

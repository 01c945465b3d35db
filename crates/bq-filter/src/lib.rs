//! Compiles bq query syntax trees into backend-neutral filter trees.
//!
//! The [`Compiler`] maps each tag onto a [`Filter`]: ranges, terms, prefixes, existence checks,
//! and boolean combinations. Keyless searches fan out across the [`SearchFields`] defaults, and
//! the `binary.tag` / `feature.tag` keys are resolved through a caller-supplied [`TagResolver`].
//!
//! # Example
//!
//! ```
//! use bq_filter::{Compiler, Filter, FilterValue};
//!
//! let expr = bq_query::parse("size:>1000").unwrap();
//! let (filter, _) = Compiler::default().compile(expr.as_ref(), None).unwrap();
//! assert!(matches!(
//!     filter,
//!     Filter::Range { gt: Some(FilterValue::Int(1000)), .. }
//! ));
//! ```

#![warn(missing_docs)]

mod compile;
mod fields;
mod filter;
mod resolver;

pub use compile::{
    BINARY_TAG_KEY, CompileError, CompileInfo, Compiler, FEATURE_TAG_KEY, MAGIC_KEYS,
};
pub use fields::{
    DEFAULT_CASE_SENSITIVE_PREFIX, DEFAULT_FEATURES_MAP, DEFAULT_FUZZY_HASH, DEFAULT_HASH_PREFIX,
    DEFAULT_PRIMARY_ID, DEFAULT_PRIMARY_ID_BOOST, SearchFields,
};
pub use filter::{BoolFilter, Filter, FilterValue, LookupKind};
pub use resolver::{ResolverError, StaticTagResolver, TagResolver};

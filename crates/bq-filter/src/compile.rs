//! Query compiler.
//!
//! Compiles a query AST into a [`Filter`] tree.

use bq_query::{Comparator, Expression, LogicalOperator, Operator, Tag, Value};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    fields::SearchFields,
    filter::{BoolFilter, Filter, FilterValue, LookupKind},
    resolver::{ResolverError, TagResolver},
};

/// Key whose value names a binary tag.
pub const BINARY_TAG_KEY: &str = "binary.tag";

/// Key whose value names a feature tag.
pub const FEATURE_TAG_KEY: &str = "feature.tag";

/// Keys compiled through a tag lookup rather than as document fields.
pub const MAGIC_KEYS: &[&str] = &[BINARY_TAG_KEY, FEATURE_TAG_KEY];

/// Errors that can occur while compiling a query.
#[derive(Debug, Error)]
pub enum CompileError {
    /// A range value was used without a field key.
    #[error("range search requires a field")]
    RangeRequiresField,

    /// A magic key was used with an unsupported comparator or value.
    #[error("{key} search must be a literal search on a string value")]
    BadMagicKey {
        /// The magic key as written.
        key: String,
    },

    /// A binary tag resolved to no binaries.
    #[error("tag not found: {tag}")]
    TagNotFound {
        /// Tag name.
        tag: String,
    },

    /// A feature tag resolved to no feature values.
    #[error("feature value tag not found: {tag}")]
    FeatureTagNotFound {
        /// Tag name.
        tag: String,
    },

    /// A magic key was used but no resolver was supplied.
    #[error("dynamic evaluation needed for tag searches")]
    ResolverUnavailable,

    /// The resolver failed.
    #[error("tag lookup failed: {source}")]
    Resolver {
        /// Error returned by the resolver.
        source: ResolverError,
    },
}

/// Facts about a compiled query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileInfo {
    /// The query searched `binary.tag`.
    pub binary_tag_used: bool,
    /// The query searched `feature.tag`.
    pub feature_tag_used: bool,
}

/// Compiles query AST nodes into filter trees.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    /// Field names for global search and tag resolution.
    fields: SearchFields,
}

impl Compiler {
    /// Creates a compiler targeting the given fields.
    pub fn new(fields: SearchFields) -> Self {
        Self { fields }
    }

    /// The fields this compiler targets.
    pub fn fields(&self) -> &SearchFields {
        &self.fields
    }

    /// Compiles an expression and resolves any magic tag searches.
    ///
    /// An absent expression compiles to a filter matching everything.
    pub fn compile(
        &self,
        expr: Option<&Expression>,
        resolver: Option<&dyn TagResolver>,
    ) -> Result<(Filter, CompileInfo), CompileError> {
        let (mut filter, info) = self.compile_deferred(expr)?;
        if info.binary_tag_used || info.feature_tag_used {
            filter.resolve_lookups(
                resolver,
                &self.fields.primary_id,
                &self.fields.features_map,
            )?;
        }
        Ok((filter, info))
    }

    /// Compiles an expression, leaving magic tag searches as [`Filter::ExternalLookup`] nodes.
    pub fn compile_deferred(
        &self,
        expr: Option<&Expression>,
    ) -> Result<(Filter, CompileInfo), CompileError> {
        let mut info = CompileInfo::default();
        let filter = match expr {
            Some(expr) => self.compile_expr(expr, &mut info)?,
            None => Filter::match_all(),
        };
        debug!(
            binary_tag_used = info.binary_tag_used,
            feature_tag_used = info.feature_tag_used,
            "compiled query"
        );
        Ok((filter, info))
    }

    /// Compiles one node.
    fn compile_expr(
        &self,
        expr: &Expression,
        info: &mut CompileInfo,
    ) -> Result<Filter, CompileError> {
        match expr {
            Expression::Logical(node) => self.compile_logical(node, info),
            Expression::Tag(tag) => self.compile_tag(tag, info),
        }
    }

    /// Compiles AND, OR, and NOT nodes.
    fn compile_logical(
        &self,
        node: &LogicalOperator,
        info: &mut CompileInfo,
    ) -> Result<Filter, CompileError> {
        let children = node
            .children
            .iter()
            .map(|child| self.compile_expr(child, info))
            .collect::<Result<Vec<_>, _>>()?;

        let bool_filter = match node.operator {
            Operator::And => BoolFilter {
                filter: children,
                ..BoolFilter::default()
            },
            Operator::Or => BoolFilter {
                should: children,
                minimum_should_match: Some(1),
                ..BoolFilter::default()
            },
            Operator::Not => {
                // Documents missing the field would otherwise match a negated field search.
                let filter = node
                    .children
                    .first()
                    .map(guarded_keys)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|key| Filter::Exists {
                        field: key.to_string(),
                    })
                    .collect();
                BoolFilter {
                    filter,
                    must_not: children,
                    ..BoolFilter::default()
                }
            }
        };
        Ok(Filter::Bool(bool_filter))
    }

    /// Compiles a single tag.
    fn compile_tag(&self, tag: &Tag, info: &mut CompileInfo) -> Result<Filter, CompileError> {
        let Some(key) = &tag.key else {
            return match &tag.value {
                Some(value) => self.compile_global(value),
                None => Ok(Filter::match_all()),
            };
        };
        let key = key.value.as_str();

        if let Some(kind) = magic_kind(key) {
            return compile_magic(key, kind, tag, info);
        }

        let comparator = tag.comparator.unwrap_or(Comparator::Match);
        let Some(value) = &tag.value else {
            trace!(key, "exists search");
            return Ok(Filter::Exists {
                field: key.to_string(),
            });
        };

        Ok(compile_field(key, comparator, value))
    }

    /// Compiles a keyless search across the default fields.
    fn compile_global(&self, value: &Value) -> Result<Filter, CompileError> {
        let text = match value {
            Value::String(s) => s.value.clone(),
            Value::Number(n) => n.value.to_string(),
            Value::Range(_) => return Err(CompileError::RangeRequiresField),
        };
        let lower = text.to_lowercase();
        let fields = &self.fields;

        let mut should = vec![
            Filter::Term {
                field: fields.primary_id.clone(),
                value: FilterValue::String(lower.clone()),
                case_insensitive: false,
                boost: Some(fields.primary_id_boost),
            },
            prefix(&fields.primary_id, &lower),
        ];
        should.extend(fields.hash_prefix.iter().map(|f| prefix(f, &lower)));
        should.push(prefix(&fields.fuzzy_hash, &text));
        should.extend(fields.case_sensitive_prefix.iter().map(|f| prefix(f, &text)));

        Ok(Filter::Bool(BoolFilter {
            should,
            minimum_should_match: Some(1),
            ..BoolFilter::default()
        }))
    }
}

/// Returns the lookup kind if `key` is a magic key.
fn magic_kind(key: &str) -> Option<LookupKind> {
    if key.eq_ignore_ascii_case(BINARY_TAG_KEY) {
        Some(LookupKind::BinaryTag)
    } else if key.eq_ignore_ascii_case(FEATURE_TAG_KEY) {
        Some(LookupKind::FeatureTag)
    } else {
        None
    }
}

/// Returns the key of a tag that searches a real document field.
fn field_key(tag: &Tag) -> Option<&str> {
    let key = tag.key.as_ref()?.value.as_str();
    magic_kind(key).is_none().then_some(key)
}

/// Distinct non-magic keys used directly by a negated child, in source order.
///
/// A tag contributes its own key. An AND or OR contributes the keys of its direct tag
/// children; deeper nesting is not inspected.
fn guarded_keys(child: &Expression) -> Vec<&str> {
    let tags: Vec<&Tag> = match child {
        Expression::Tag(tag) => vec![tag],
        Expression::Logical(node) if node.operator != Operator::Not => node
            .children
            .iter()
            .filter_map(Expression::as_tag)
            .collect(),
        Expression::Logical(_) => Vec::new(),
    };

    let mut keys: Vec<&str> = Vec::new();
    for key in tags.into_iter().filter_map(field_key) {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Compiles a magic key search into a lookup placeholder.
fn compile_magic(
    key: &str,
    kind: LookupKind,
    tag: &Tag,
    info: &mut CompileInfo,
) -> Result<Filter, CompileError> {
    let literal = matches!(
        tag.comparator,
        Some(Comparator::Match | Comparator::Equal)
    );
    let name = match &tag.value {
        Some(Value::String(s)) if literal => s.value.clone(),
        Some(Value::Number(n)) if literal => n.value.to_string(),
        _ => {
            return Err(CompileError::BadMagicKey {
                key: key.to_string(),
            });
        }
    };

    match kind {
        LookupKind::BinaryTag => info.binary_tag_used = true,
        LookupKind::FeatureTag => info.feature_tag_used = true,
    }
    trace!(key, tag = %name, "deferred tag lookup");
    Ok(Filter::ExternalLookup { kind, key: name })
}

/// Compiles a keyed search with a value.
fn compile_field(key: &str, comparator: Comparator, value: &Value) -> Filter {
    let literal = match value {
        Value::Range(range) => {
            return Filter::range(key)
                .lower(FilterValue::Int(range.start), range.start_inclusive)
                .upper(FilterValue::Int(range.end), range.end_inclusive)
                .build();
        }
        Value::String(s) => FilterValue::String(s.value.clone()),
        Value::Number(n) => FilterValue::from(n.value),
    };

    match comparator {
        Comparator::Greater => Filter::range(key).lower(literal, false).build(),
        Comparator::GreaterOrEqual => Filter::range(key).lower(literal, true).build(),
        Comparator::Less => Filter::range(key).upper(literal, false).build(),
        Comparator::LessOrEqual => Filter::range(key).upper(literal, true).build(),
        Comparator::Equal => term(key, literal, false),
        Comparator::Match => match value {
            Value::String(s) => match s.value.strip_suffix('*') {
                Some(stem) => Filter::Prefix {
                    field: key.to_string(),
                    value: stem.to_string(),
                    case_insensitive: s.case_insensitive(),
                },
                None => term(key, literal, s.case_insensitive()),
            },
            _ => term(key, literal, false),
        },
    }
}

/// Builds an unboosted term filter.
fn term(field: &str, value: FilterValue, case_insensitive: bool) -> Filter {
    Filter::Term {
        field: field.to_string(),
        value,
        case_insensitive,
        boost: None,
    }
}

/// Builds a case-sensitive prefix filter.
fn prefix(field: &str, value: &str) -> Filter {
    Filter::Prefix {
        field: field.to_string(),
        value: value.to_string(),
        case_insensitive: false,
    }
}

#[cfg(test)]
mod tests {
    use bq_query::parse;

    use super::*;
    use crate::resolver::StaticTagResolver;

    fn compile(query: &str) -> Result<Filter, CompileError> {
        let expr = parse(query).unwrap();
        Compiler::default()
            .compile(expr.as_ref(), None)
            .map(|(filter, _)| filter)
    }

    fn compile_with(query: &str, resolver: &StaticTagResolver) -> Result<Filter, CompileError> {
        let expr = parse(query).unwrap();
        Compiler::default()
            .compile(expr.as_ref(), Some(resolver))
            .map(|(filter, _)| filter)
    }

    fn range(
        field: &str,
        gt: Option<FilterValue>,
        gte: Option<FilterValue>,
        lt: Option<FilterValue>,
        lte: Option<FilterValue>,
    ) -> Filter {
        Filter::Range {
            field: field.into(),
            gt,
            gte,
            lt,
            lte,
        }
    }

    mod fields {
        use super::*;

        #[test]
        fn greater_than_is_exclusive_range() {
            assert_eq!(
                compile("size:>1000").unwrap(),
                range("size", Some(FilterValue::Int(1000)), None, None, None)
            );
        }

        #[test]
        fn comparators_map_to_bounds() {
            assert_eq!(
                compile("size:>=1kb").unwrap(),
                range("size", None, Some(FilterValue::Int(1000)), None, None)
            );
            assert_eq!(
                compile("size:<5").unwrap(),
                range("size", None, None, Some(FilterValue::Int(5)), None)
            );
            assert_eq!(
                compile("size:<=5").unwrap(),
                range("size", None, None, None, Some(FilterValue::Int(5)))
            );
        }

        #[test]
        fn string_range_bound() {
            assert_eq!(
                compile("first_seen:>2020-01-01").unwrap(),
                range(
                    "first_seen",
                    Some(FilterValue::String("2020-01-01".into())),
                    None,
                    None,
                    None
                )
            );
        }

        #[test]
        fn range_value() {
            assert_eq!(
                compile("size:[1 TO 10)").unwrap(),
                range(
                    "size",
                    None,
                    Some(FilterValue::Int(1)),
                    Some(FilterValue::Int(10)),
                    None
                )
            );
        }

        #[test]
        fn match_string_is_case_insensitive_term() {
            assert_eq!(
                compile("file_format:PE").unwrap(),
                term("file_format", "PE".into(), true)
            );
        }

        #[test]
        fn double_quoted_is_case_sensitive() {
            assert_eq!(
                compile("filename:\"Setup.exe\"").unwrap(),
                term("filename", "Setup.exe".into(), false)
            );
        }

        #[test]
        fn equal_is_case_sensitive() {
            assert_eq!(
                compile("file_format:=pe*").unwrap(),
                term("file_format", "pe*".into(), false)
            );
        }

        #[test]
        fn number_match_is_term() {
            assert_eq!(
                compile("size:1mb").unwrap(),
                term("size", FilterValue::Int(1_000_000), false)
            );
        }

        #[test]
        fn float_match_and_equal_are_terms() {
            assert_eq!(
                compile("entropy:7.5").unwrap(),
                term("entropy", FilterValue::Float(7.5), false)
            );
            assert_eq!(
                compile("entropy:=0.25").unwrap(),
                term("entropy", FilterValue::Float(0.25), false)
            );
        }

        #[test]
        fn single_quoted_is_case_insensitive() {
            assert_eq!(
                compile("filename:'Setup.exe'").unwrap(),
                term("filename", "Setup.exe".into(), true)
            );
        }

        #[test]
        fn trailing_star_is_prefix() {
            assert_eq!(
                compile("filename:setup*").unwrap(),
                Filter::Prefix {
                    field: "filename".into(),
                    value: "setup".into(),
                    case_insensitive: true,
                }
            );
        }

        #[test]
        fn only_one_star_removed() {
            assert_eq!(
                compile("filename:\"a**\"").unwrap(),
                Filter::Prefix {
                    field: "filename".into(),
                    value: "a*".into(),
                    case_insensitive: false,
                }
            );
        }

        #[test]
        fn valueless_key_is_exists() {
            assert_eq!(
                compile("av.result:").unwrap(),
                Filter::Exists {
                    field: "av.result".into()
                }
            );
        }
    }

    mod global {
        use super::*;

        #[test]
        fn fans_out_over_default_fields() {
            let Filter::Bool(b) = compile("DeadBeef").unwrap() else {
                panic!("expected bool");
            };
            assert_eq!(b.minimum_should_match, Some(1));
            assert_eq!(
                b.should[0],
                Filter::Term {
                    field: "sha256".into(),
                    value: "deadbeef".into(),
                    case_insensitive: false,
                    boost: Some(20.0),
                }
            );
            assert_eq!(b.should[1], prefix("sha256", "deadbeef"));
            assert_eq!(b.should[2], prefix("sha1", "deadbeef"));
            assert_eq!(b.should[4], prefix("sha512", "deadbeef"));
            assert_eq!(b.should[5], prefix("ssdeep", "DeadBeef"));
            assert_eq!(b.should[9], prefix("filename", "DeadBeef"));
            assert_eq!(b.should.len(), 10);
        }

        #[test]
        fn custom_fields() {
            let fields = SearchFields {
                primary_id: "id".into(),
                primary_id_boost: 3.0,
                hash_prefix: vec![],
                fuzzy_hash: "fz".into(),
                case_sensitive_prefix: vec![],
                features_map: "fm".into(),
            };
            let expr = parse("x").unwrap();
            let (filter, _) = Compiler::new(fields).compile(expr.as_ref(), None).unwrap();
            let Filter::Bool(b) = filter else {
                panic!("expected bool");
            };
            assert_eq!(b.should.len(), 3);
            assert_eq!(b.should[2], prefix("fz", "x"));
        }

        #[test]
        fn range_requires_field() {
            assert!(matches!(
                compile("[1 TO 2]"),
                Err(CompileError::RangeRequiresField)
            ));
        }

        #[test]
        fn empty_query_matches_all() {
            assert_eq!(compile("").unwrap(), Filter::match_all());
            assert_eq!(compile("   ").unwrap(), Filter::match_all());
        }
    }

    mod logical {
        use super::*;

        #[test]
        fn and_is_filter_clauses() {
            let Filter::Bool(b) = compile("a:1 b:2").unwrap() else {
                panic!("expected bool");
            };
            assert_eq!(b.filter.len(), 2);
            assert!(b.should.is_empty());
        }

        #[test]
        fn or_is_should() {
            let Filter::Bool(b) = compile("a:1 OR b:2").unwrap() else {
                panic!("expected bool");
            };
            assert_eq!(b.should.len(), 2);
            assert_eq!(b.minimum_should_match, Some(1));
        }

        #[test]
        fn not_field_requires_existence() {
            let Filter::Bool(b) = compile("NOT file_format:pe").unwrap() else {
                panic!("expected bool");
            };
            assert_eq!(
                b.filter,
                vec![Filter::Exists {
                    field: "file_format".into()
                }]
            );
            assert_eq!(b.must_not, vec![term("file_format", "pe".into(), true)]);
        }

        #[test]
        fn not_global_has_no_exists() {
            let Filter::Bool(b) = compile("!deadbeef").unwrap() else {
                panic!("expected bool");
            };
            assert!(b.filter.is_empty());
            assert_eq!(b.must_not.len(), 1);
        }

        fn exists(field: &str) -> Filter {
            Filter::Exists {
                field: field.into(),
            }
        }

        #[test]
        fn not_and_group_requires_each_key() {
            let Filter::Bool(b) = compile("NOT (a:1 AND b:2)").unwrap() else {
                panic!("expected bool");
            };
            assert_eq!(b.filter, vec![exists("a"), exists("b")]);
            assert_eq!(b.must_not.len(), 1);
        }

        #[test]
        fn not_or_group_requires_each_key_once() {
            let Filter::Bool(b) = compile("NOT (a:1 OR b:2 OR a:3)").unwrap() else {
                panic!("expected bool");
            };
            assert_eq!(b.filter, vec![exists("a"), exists("b")]);
        }

        #[test]
        fn not_group_skips_globals_magic_and_nested() {
            let expr = parse("NOT (deadbeef OR binary.tag:x OR (c:1 d:2) OR e:)").unwrap();
            let (filter, _) = Compiler::default().compile_deferred(expr.as_ref()).unwrap();
            let Filter::Bool(b) = filter else {
                panic!("expected bool");
            };
            assert_eq!(b.filter, vec![exists("e")]);
        }
    }

    mod magic {
        use super::*;

        #[test]
        fn binary_tag_resolves_to_terms() {
            let resolver = StaticTagResolver::default().with_binary_tag("apt", &["aa", "bb"]);
            let expr = parse("binary.tag:apt").unwrap();
            let (filter, info) = Compiler::default()
                .compile(expr.as_ref(), Some(&resolver))
                .unwrap();
            assert_eq!(
                filter,
                Filter::Terms {
                    field: "sha256".into(),
                    values: vec!["aa".into(), "bb".into()],
                }
            );
            assert!(info.binary_tag_used);
            assert!(!info.feature_tag_used);
        }

        #[test]
        fn key_is_case_insensitive() {
            let resolver = StaticTagResolver::default().with_binary_tag("apt", &["aa"]);
            assert!(compile_with("Binary.Tag:=apt", &resolver).is_ok());
        }

        #[test]
        fn feature_tag_nested_in_boolean() {
            let resolver = StaticTagResolver::default()
                .with_feature_tag("packed", "packer", "upx")
                .with_feature_tag("packed", "packer", "aspack");
            let Filter::Bool(outer) =
                compile_with("size:>1 AND feature.tag:packed", &resolver).unwrap()
            else {
                panic!("expected bool");
            };
            let Filter::Bool(inner) = &outer.filter[1] else {
                panic!("expected nested bool");
            };
            assert_eq!(inner.should.len(), 2);
            assert!(!outer.filter[1].has_lookups());
        }

        #[test]
        fn not_magic_has_no_exists() {
            let resolver = StaticTagResolver::default().with_binary_tag("apt", &["aa"]);
            let Filter::Bool(b) = compile_with("NOT binary.tag:apt", &resolver).unwrap() else {
                panic!("expected bool");
            };
            assert!(b.filter.is_empty());
        }

        #[test]
        fn unknown_tags() {
            let resolver = StaticTagResolver::default();
            assert!(matches!(
                compile_with("binary.tag:nope", &resolver),
                Err(CompileError::TagNotFound { tag }) if tag == "nope"
            ));
            assert!(matches!(
                compile_with("feature.tag:nope", &resolver),
                Err(CompileError::FeatureTagNotFound { .. })
            ));
        }

        #[test]
        fn requires_resolver() {
            let err = compile("binary.tag:apt").unwrap_err();
            assert!(matches!(err, CompileError::ResolverUnavailable));
            assert_eq!(err.to_string(), "dynamic evaluation needed for tag searches");
        }

        #[test]
        fn rejects_non_literal_searches() {
            for query in ["binary.tag:>apt", "binary.tag:", "feature.tag:[1 TO 2]"] {
                let err = compile(query).unwrap_err();
                assert!(matches!(err, CompileError::BadMagicKey { .. }), "{query}");
            }
            assert_eq!(
                compile("feature.tag:<x").unwrap_err().to_string(),
                "feature.tag search must be a literal search on a string value"
            );
        }

        #[test]
        fn resolver_errors_pass_through() {
            struct Failing;
            impl TagResolver for Failing {
                fn resolve_binary_tag(&self, _: &str) -> Result<Vec<String>, ResolverError> {
                    Err("store offline".into())
                }
                fn resolve_feature_tag(
                    &self,
                    _: &str,
                ) -> Result<Vec<(String, String)>, ResolverError> {
                    Err("store offline".into())
                }
            }
            let expr = parse("binary.tag:apt").unwrap();
            let err = Compiler::default()
                .compile(expr.as_ref(), Some(&Failing))
                .unwrap_err();
            let CompileError::Resolver { source } = &err else {
                panic!("expected resolver error");
            };
            assert_eq!(source.to_string(), "store offline");
            assert_eq!(err.to_string(), "tag lookup failed: store offline");
        }

        #[test]
        fn deferred_leaves_placeholders() {
            let expr = parse("binary.tag:apt OR feature.tag:packed").unwrap();
            let (filter, info) = Compiler::default().compile_deferred(expr.as_ref()).unwrap();
            assert!(filter.has_lookups());
            assert!(info.binary_tag_used && info.feature_tag_used);
            let Filter::Bool(b) = filter else {
                panic!("expected bool");
            };
            assert_eq!(
                b.should[0],
                Filter::ExternalLookup {
                    kind: LookupKind::BinaryTag,
                    key: "apt".into()
                }
            );
        }
    }

    #[test]
    fn compiled_filter_serializes() {
        let json = serde_json::to_value(compile("filename:setup*").unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "prefix": { "field": "filename", "value": "setup", "case_insensitive": true }
            })
        );
    }
}

//! Document field names used by the compiler.

/// Default primary identifier field.
pub const DEFAULT_PRIMARY_ID: &str = "sha256";

/// Default boost applied to an exact primary id match in global search.
pub const DEFAULT_PRIMARY_ID_BOOST: f32 = 20.0;

/// Default fields searched by case-insensitive prefix in global search.
pub const DEFAULT_HASH_PREFIX: &[&str] = &["sha1", "md5", "sha512"];

/// Default fuzzy hash field.
pub const DEFAULT_FUZZY_HASH: &str = "ssdeep";

/// Default fields searched by case-sensitive prefix in global search.
pub const DEFAULT_CASE_SENSITIVE_PREFIX: &[&str] =
    &["tlsh", "file_format", "file_extension", "filename"];

/// Default object field holding per-feature values.
pub const DEFAULT_FEATURES_MAP: &str = "features_map";

/// Field names the compiler targets.
///
/// Global (keyless) searches fan out across these, and the magic tag keys resolve into them.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFields {
    /// Primary identifier field.
    pub primary_id: String,
    /// Boost on an exact primary id match.
    pub primary_id_boost: f32,
    /// Hash fields matched by lowercased prefix.
    pub hash_prefix: Vec<String>,
    /// Fuzzy hash field matched by prefix as typed.
    pub fuzzy_hash: String,
    /// Fields matched by prefix as typed.
    pub case_sensitive_prefix: Vec<String>,
    /// Object field whose subfields hold feature values.
    pub features_map: String,
}

impl Default for SearchFields {
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

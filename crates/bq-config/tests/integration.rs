//! Integration tests for bq-config.
//!
//! Tests the full configuration loading pipeline: discovery -> parse -> merge.

// Integration tests live outside cfg(test) by design
#![allow(clippy::tests_outside_test_module)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use bq_config::{Config, ConfigError, ConfigWarning, is_global_config};
use bq_filter::{Compiler, Filter, TagResolver};

/// Test helper to create a temporary directory structure for tests.
struct TestEnv {
    root: tempfile::TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    /// Creates a directory and returns its path.
    fn create_dir(&self, rel_path: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Creates a file with content and returns its path.
    fn create_file(&self, rel_path: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }
}

/// Loads only the files under the test root, ignoring any real `~/.bq.toml`.
fn load_local(cwd: &Path) -> Result<Config, ConfigError> {
    let files: Vec<_> = bq_config::discover_config_files(cwd)
        .into_iter()
        .filter(|p| !is_global_config(p))
        .collect();
    Config::load_from_files(&files)
}

#[test]
fn test_load_no_config_returns_default() {
    let env = TestEnv::new();
    let config = load_local(env.path()).unwrap();

    assert!(config.schema.is_empty());
    assert!(config.config_root.is_none());
    assert_eq!(config.fields.primary_id, "sha256");
    assert_eq!(config.validate(), vec![ConfigWarning::EmptySchema]);
}

#[test]
fn test_load_single_config() {
    let env = TestEnv::new();
    env.create_file(
        ".bq.toml",
        r#"
[fields]
primary_id = "sha1"

[schema]
keys = ["size", "file_format"]
"#,
    );

    let config = load_local(env.path()).unwrap();

    assert_eq!(config.fields.primary_id, "sha1");
    assert_eq!(config.schema.len(), 2);
    assert_eq!(config.config_root.as_deref(), Some(env.path()));
    assert!(config.validate().is_empty());
}

#[test]
fn test_load_nested_configs_merging() {
    let env = TestEnv::new();
    let subdir = env.create_dir("project/subdir");

    env.create_file(
        ".bq.toml",
        r#"
[fields]
fuzzy_hash = "ssdeep2"
features_map = "feats"

[schema]
keys = ["sha256"]

[tags.binary]
apt = ["aa"]
"#,
    );
    env.create_file(
        "project/.bq.toml",
        r#"
[fields]
fuzzy_hash = "tlsh"

[schema]
keys = "size"

[tags.binary]
apt = ["bb", "cc"]
"#,
    );

    let config = load_local(&subdir).unwrap();

    assert_eq!(config.fields.fuzzy_hash, "tlsh");
    assert_eq!(config.fields.features_map, "feats");
    assert!(config.schema.contains("sha256"));
    assert!(config.schema.contains("size"));
    assert_eq!(config.tags.binary["apt"], vec!["bb", "cc"]);
    assert_eq!(config.sources.len(), 2);
    assert_eq!(config.config_root, Some(env.path().join("project")));
}

#[test]
fn test_root_config_hides_parents() {
    let env = TestEnv::new();
    env.create_file(".bq.toml", "[schema]\nkeys = [\"outer\"]\n");
    env.create_file("project/.bq.toml", "root = true\n[schema]\nkeys = [\"inner\"]\n");

    let config = Config::load(&env.path().join("project")).unwrap();

    assert_eq!(config.sources.len(), 1);
    assert!(config.schema.contains("inner"));
    assert!(!config.schema.contains("outer"));
}

#[test]
fn test_load_error_invalid_toml() {
    let env = TestEnv::new();
    let path = env.create_file(".bq.toml", "[fields\n");

    let err = Config::load_from_files(&[path.clone()]).unwrap_err();

    match err {
        ConfigError::ParseToml { path: p, .. } => assert_eq!(p, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_load_error_missing_file() {
    let env = TestEnv::new();
    let missing = env.path().join("nope.toml");

    let err = Config::load_from_files(&[missing]).unwrap_err();

    assert!(matches!(err, ConfigError::ReadFile { .. }));
}

#[test]
fn test_load_from_files_precedence() {
    let env = TestEnv::new();
    let high = env.create_file("a.toml", "[fields]\nprimary_id_boost = 2.0\n");
    let low = env.create_file(
        "b.toml",
        "[fields]\nprimary_id_boost = 9.0\nhash_prefix = \"md5\"\n",
    );

    let config = Config::load_from_files(&[high, low]).unwrap();

    assert!((config.fields.primary_id_boost - 2.0).abs() < f32::EPSILON);
    assert_eq!(config.fields.hash_prefix, vec!["md5"]);
}

#[test]
fn test_loaded_config_drives_compiler() {
    let env = TestEnv::new();
    env.create_file(
        ".bq.toml",
        r#"
root = true

[fields]
primary_id = "id"

[tags.feature]
packed = [{ name = "packer", value = "upx" }]
"#,
    );

    let config = Config::load(env.path()).unwrap();
    let resolver = config.tag_resolver();
    assert_eq!(
        resolver.resolve_feature_tag("packed").unwrap(),
        vec![("packer".to_string(), "upx".to_string())]
    );

    let expr = bq_query::parse("feature.tag:packed").unwrap();
    let (filter, info) = Compiler::new(config.search_fields())
        .compile(expr.as_ref(), Some(&resolver))
        .unwrap();
    assert!(info.feature_tag_used);
    let Filter::Bool(b) = filter else {
        panic!("expected bool filter");
    };
    assert!(matches!(
        &b.should[0],
        Filter::Term { field, .. } if field == "features_map.packer"
    ));
}

#[test]
fn test_validation_warnings_from_files() {
    let env = TestEnv::new();
    env.create_file(
        ".bq.toml",
        r#"
root = true

[fields]
primary_id = ""
hash_prefix = ["md5", "md5"]

[schema]
keys = ["size"]

[tags.binary]
empty = []
"#,
    );

    let config = Config::load(env.path()).unwrap();
    let warnings = config.validate();

    assert!(warnings.contains(&ConfigWarning::BlankFieldName {
        setting: "fields.primary_id".into()
    }));
    assert!(warnings.contains(&ConfigWarning::DuplicatePrefixField {
        field: "md5".into()
    }));
    assert!(warnings.contains(&ConfigWarning::EmptyTag {
        table: "binary",
        tag: "empty".into()
    }));
}

//! Configuration templates for `bq init`.
//!
//! Templates are stored as valid TOML files and returned as commented-out
//! example configurations.

/// Default local configuration template (valid TOML).
const LOCAL_TEMPLATE: &str = include_str!("../templates/config.toml");

/// Global configuration template (valid TOML).
const GLOBAL_TEMPLATE: &str = include_str!("../templates/config-global.toml");

/// Returns the local configuration template as a commented-out example.
pub fn local_template() -> String {
    comment_template(LOCAL_TEMPLATE)
}

/// Returns the global configuration template as a commented-out example.
pub fn global_template() -> String {
    comment_template(GLOBAL_TEMPLATE)
}

/// Prefixes every non-empty, non-comment line with `# `.
fn comment_template(template: &str) -> String {
    let mut result = String::with_capacity(template.len() + template.lines().count() * 2);
    for line in template.lines() {
        if !line.is_empty() && !line.starts_with('#') {
            result.push_str("# ");
        }
        result.push_str(line);
        result.push('\n');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_config;

    #[test]
    fn local_template_parses_as_valid_toml() {
        let config = parse_config(LOCAL_TEMPLATE).unwrap();
        let tags = config.tags.unwrap();
        assert!(tags.binary.unwrap().contains_key("suspicious"));
        assert_eq!(tags.feature.unwrap()["packed"][0].name, "packer");
    }

    #[test]
    fn global_template_parses_as_valid_toml() {
        let result = parse_config(GLOBAL_TEMPLATE);
        assert!(
            result.is_ok(),
            "global template failed to parse: {result:?}"
        );
    }

    #[test]
    fn commented_template_is_inert() {
        let config = parse_config(&local_template()).unwrap();
        assert!(config.fields.is_none());
        assert!(config.tags.is_none());
    }

    #[test]
    fn comment_template_prefixes_content_lines() {
        let input = "# note\n[section]\n\nkey = \"value\"\n";
        assert_eq!(
            comment_template(input),
            "# note\n# [section]\n\n# key = \"value\"\n"
        );
    }
}

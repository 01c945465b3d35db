//! Field key validation.

use std::collections::HashSet;

use crate::ast::Expression;

/// Returns the field keys in `expr` that are not in `valid_keys`, in source order.
///
/// Global (keyless) tags cannot be checked and are never reported. A key is reported once per
/// tag that uses it.
pub fn validate(expr: &Expression, valid_keys: &HashSet<String>) -> Vec<String> {
    let mut invalid = Vec::new();
    collect_invalid(expr, valid_keys, &mut invalid);
    invalid
}

/// Recursive worker for [`validate`].
fn collect_invalid(expr: &Expression, valid_keys: &HashSet<String>, out: &mut Vec<String>) {
    match expr {
        Expression::Logical(node) => {
            for child in &node.children {
                collect_invalid(child, valid_keys, out);
            }
        }
        Expression::Tag(tag) => {
            if let (Some(key), Some(_)) = (&tag.key, tag.comparator)
                && !valid_keys.contains(&key.value)
            {
                out.push(key.value.clone());
            }
        }
    }
}

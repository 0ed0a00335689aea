//! Mapping reversal
//!
//! Derives the target-to-source mapping from a source-to-target one, so a
//! single definition can serve both directions. Nested target structures
//! flatten to dot-paths first; every expression leaf `target -> {{ path }}`
//! becomes `path -> {{ target }}`. Filters and defaults do not carry over,
//! and non-expression leaves (static literals) are dropped: neither has a
//! mechanical inverse. That makes reversal lossy by design, but pure
//! path-to-path mappings survive a double reversal unchanged.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::expression;
use crate::mapping::pair::join_path;
use serde_json::Value;

/// Reverse a flat or nested `target -> sourceExpr` mapping
pub fn reverse(mapping: &Value) -> Result<Value> {
    let map = mapping.as_object().ok_or_else(|| {
        Error::configuration_in(
            format!("mapping to reverse must be an object, got {}", mapping),
            "reverse",
        )
    })?;

    let mut reversed = serde_json::Map::new();
    walk(map, "", &mut reversed)?;
    Ok(Value::Object(reversed))
}

fn walk(
    map: &serde_json::Map<String, Value>,
    prefix: &str,
    out: &mut serde_json::Map<String, Value>,
) -> Result<()> {
    for (key, value) in map {
        let target_path = join_path(prefix, key);
        match value {
            Value::Object(nested) => walk(nested, &target_path, out)?,
            Value::String(text) if expression::is_expression(text) => {
                let parsed = expression::parse(text)?;
                out.insert(
                    parsed.path,
                    Value::String(format!("{{{{ {} }}}}", target_path)),
                );
            }
            other => {
                log::trace!(
                    "dropping non-reversible leaf at '{}': {}",
                    target_path,
                    other
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_reversal() {
        let reversed = reverse(&json!({
            "name": "{{ user.firstname }}",
            "mail": "{{ user.email }}"
        }))
        .unwrap();
        assert_eq!(
            reversed,
            json!({
                "user.firstname": "{{ name }}",
                "user.email": "{{ mail }}"
            })
        );
    }

    #[test]
    fn test_nested_targets_flatten() {
        let reversed = reverse(&json!({
            "contact": {"mail": "{{ user.email }}"}
        }))
        .unwrap();
        assert_eq!(reversed, json!({"user.email": "{{ contact.mail }}"}));
    }

    #[test]
    fn test_filters_and_defaults_do_not_carry() {
        let reversed = reverse(&json!({
            "name": "{{ user.firstname | upper ?? unknown }}"
        }))
        .unwrap();
        assert_eq!(reversed, json!({"user.firstname": "{{ name }}"}));
    }

    #[test]
    fn test_non_expression_leaves_dropped() {
        let reversed = reverse(&json!({
            "kind": "customer",
            "version": 7,
            "name": "{{ user.firstname }}"
        }))
        .unwrap();
        assert_eq!(reversed, json!({"user.firstname": "{{ name }}"}));
    }

    #[test]
    fn test_double_reversal_is_identity_for_pure_paths() {
        let original = json!({
            "name": "{{ user.firstname }}",
            "mail": "{{ user.email }}"
        });
        let twice = reverse(&reverse(&original).unwrap()).unwrap();
        assert_eq!(twice, original);
    }
}

//! Dot-path read access with wildcard expansion
//!
//! Paths are dot-separated segments (`user.addresses.0.city`). A `*` segment
//! matches every element of an array (or every value of an object) at that
//! position. Wildcard reads return an ordered collection keyed by the
//! concrete sub-path from the first wildcard to the leaf, so
//! `users.*.email` yields keys like `"0.email"` and `*.users.*.email`
//! yields keys like `"0.users.1.email"`.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use crate::wildcard::{WildcardKey, WildcardResult};
use serde_json::Value;

/// Result of a path read: a single value or a wildcard expansion
#[derive(Debug, Clone, PartialEq)]
pub enum PathValue {
    /// The path contained no wildcard and matched one value
    Single(Value),
    /// The path contained at least one wildcard
    Wildcard(WildcardResult),
}

impl PathValue {
    /// Unwrap a single value, collecting wildcard matches into an array
    pub fn into_single(self) -> Value {
        match self {
            PathValue::Single(value) => value,
            PathValue::Wildcard(result) => result.into_array(),
        }
    }
}

/// Read the value at a dot-path
///
/// Returns `None` when a wildcard-free path does not exist, or when the
/// prefix leading up to the first wildcard does not exist. A present
/// wildcard prefix always yields `Some(Wildcard(..))`, possibly empty.
pub fn get(source: &Value, path: &str) -> Option<PathValue> {
    if path.is_empty() {
        return Some(PathValue::Single(source.clone()));
    }
    let segments: Vec<&str> = path.split('.').collect();

    match segments.iter().position(|seg| *seg == "*") {
        None => walk(source, &segments).map(|v| PathValue::Single(v.clone())),
        Some(star) => {
            let base = walk(source, &segments[..star])?;
            let mut result = WildcardResult::new();
            expand(base, &segments[star..], &mut Vec::new(), &mut result);
            Some(PathValue::Wildcard(result))
        }
    }
}

/// Check whether a path resolves to at least one value
pub fn exists(source: &Value, path: &str) -> bool {
    match get(source, path) {
        Some(PathValue::Single(_)) => true,
        Some(PathValue::Wildcard(result)) => !result.is_empty(),
        None => false,
    }
}

/// Navigate a wildcard-free segment list
fn walk<'a>(value: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for segment in segments {
        current = step(current, segment)?;
    }
    Some(current)
}

/// Descend one segment into an object or array
fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(array) => segment.parse::<usize>().ok().and_then(|i| array.get(i)),
        _ => None,
    }
}

/// Recursive wildcard expansion
///
/// Every segment from the first wildcard onward contributes to the compound
/// key, so nested generations stay distinguishable. Items missing a trailing
/// field simply produce no entry.
fn expand(value: &Value, segments: &[&str], key: &mut Vec<String>, out: &mut WildcardResult) {
    let (segment, rest) = match segments.split_first() {
        Some(pair) => pair,
        None => {
            out.push(WildcardKey::Compound(key.join(".")), value.clone());
            return;
        }
    };

    if *segment == "*" {
        match value {
            Value::Array(array) => {
                for (index, element) in array.iter().enumerate() {
                    key.push(index.to_string());
                    expand(element, rest, key, out);
                    key.pop();
                }
            }
            Value::Object(map) => {
                for (name, element) in map {
                    key.push(name.clone());
                    expand(element, rest, key, out);
                    key.pop();
                }
            }
            _ => {}
        }
    } else if let Some(next) = step(value, segment) {
        key.push((*segment).to_string());
        expand(next, rest, key, out);
        key.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> Value {
        json!({
            "users": [
                {"name": "Ann", "email": "ann@a.com"},
                {"name": "Bob", "email": "bob@b.com"}
            ],
            "meta": {"count": 2}
        })
    }

    #[test]
    fn test_plain_path() {
        let data = fixture();
        assert_eq!(
            get(&data, "meta.count"),
            Some(PathValue::Single(json!(2)))
        );
        assert_eq!(
            get(&data, "users.1.name"),
            Some(PathValue::Single(json!("Bob")))
        );
        assert_eq!(get(&data, "meta.missing"), None);
    }

    #[test]
    fn test_single_wildcard_keys() {
        let data = fixture();
        let result = match get(&data, "users.*.email") {
            Some(PathValue::Wildcard(result)) => result,
            other => panic!("expected wildcard, got {:?}", other),
        };

        let entries: Vec<(String, Value)> = result
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("0.email".to_string(), json!("ann@a.com")),
                ("1.email".to_string(), json!("bob@b.com")),
            ]
        );
    }

    #[test]
    fn test_trailing_wildcard_keys_are_bare_indices() {
        let data = fixture();
        let result = match get(&data, "users.*") {
            Some(PathValue::Wildcard(result)) => result,
            other => panic!("expected wildcard, got {:?}", other),
        };
        let keys: Vec<String> = result.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["0", "1"]);
    }

    #[test]
    fn test_nested_wildcards() {
        let data = json!({
            "teams": [
                {"users": [{"email": "a"}, {"email": "b"}]},
                {"users": [{"email": "c"}]}
            ]
        });
        let result = match get(&data, "teams.*.users.*.email") {
            Some(PathValue::Wildcard(result)) => result,
            other => panic!("expected wildcard, got {:?}", other),
        };
        let keys: Vec<String> = result.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["0.users.0.email", "0.users.1.email", "1.users.0.email"]);
    }

    #[test]
    fn test_wildcard_over_object_uses_map_keys() {
        let data = json!({"scores": {"ann": 3, "bob": 5}});
        let result = match get(&data, "scores.*") {
            Some(PathValue::Wildcard(result)) => result,
            other => panic!("expected wildcard, got {:?}", other),
        };
        let keys: Vec<String> = result.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["ann", "bob"]);
    }

    #[test]
    fn test_missing_wildcard_prefix() {
        let data = fixture();
        assert_eq!(get(&data, "nope.*.email"), None);
    }

    #[test]
    fn test_items_without_field_are_skipped() {
        let data = json!({"users": [{"email": "a"}, {"name": "no-mail"}]});
        let result = match get(&data, "users.*.email") {
            Some(PathValue::Wildcard(result)) => result,
            other => panic!("expected wildcard, got {:?}", other),
        };
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_exists() {
        let data = fixture();
        assert!(exists(&data, "users.0.name"));
        assert!(exists(&data, "users.*.email"));
        assert!(!exists(&data, "users.*.phone"));
        assert!(!exists(&data, "ghost"));
    }
}

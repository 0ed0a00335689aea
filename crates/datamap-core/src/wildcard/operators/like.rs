//! LIKE operator
//!
//! Config is a map `fieldExpr -> pattern`, where a pattern is a string or
//! `{pattern, case_sensitive}`. SQL wildcards translate to an anchored
//! regex: `%` becomes `.*`, `_` becomes `.`, everything else is escaped.
//! Matching is case-insensitive unless requested otherwise. Multiple fields
//! combine with AND.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use super::OperatorContext;
use crate::error::{Error, Result};
use crate::path::{self, PathValue};
use crate::wildcard::WildcardResult;
use regex::Regex;
use serde_json::Value;

/// Apply a LIKE config to the collection
pub fn apply(
    items: WildcardResult,
    config: &Value,
    ctx: &mut OperatorContext,
) -> Result<WildcardResult> {
    let spec = match config {
        Value::Object(map) => map,
        other => {
            return Err(Error::configuration_in(
                format!("LIKE config must be an object, got {}", other),
                "LIKE",
            ))
        }
    };

    let mut matchers: Vec<(String, Regex)> = Vec::with_capacity(spec.len());
    for (field, pattern_spec) in spec {
        let resolved = ctx.resolve_config(pattern_spec)?;
        let (pattern, case_sensitive) = match &resolved {
            Value::String(pattern) => (pattern.clone(), false),
            Value::Object(map) => {
                let pattern = map
                    .get("pattern")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        Error::configuration_in(
                            format!("LIKE spec for '{}' is missing a 'pattern' string", field),
                            "LIKE",
                        )
                    })?
                    .to_string();
                let case_sensitive = map
                    .get("case_sensitive")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                (pattern, case_sensitive)
            }
            other => {
                return Err(Error::configuration_in(
                    format!("LIKE pattern for '{}' must be a string or object, got {}", field, other),
                    "LIKE",
                ))
            }
        };
        matchers.push((field.clone(), translate(&pattern, case_sensitive)?));
    }

    let mut kept = WildcardResult::new();
    for (key, item) in items {
        let all_match = matchers.iter().all(|(field, regex)| {
            field_text(&item, field)
                .map(|text| regex.is_match(&text))
                .unwrap_or(false)
        });
        if all_match {
            kept.push(key, item);
        }
    }
    Ok(kept)
}

/// Translate an SQL LIKE pattern into an anchored regex
fn translate(pattern: &str, case_sensitive: bool) -> Result<Regex> {
    let mut regex = String::with_capacity(pattern.len() + 8);
    if !case_sensitive {
        regex.push_str("(?i)");
    }
    regex.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');

    Regex::new(&regex).map_err(|e| {
        Error::configuration_in(format!("invalid LIKE pattern '{}': {}", pattern, e), "LIKE")
    })
}

/// Textual view of a field value; null and containers never match
fn field_text(item: &Value, field: &str) -> Option<String> {
    match path::get(item, field).map(PathValue::into_single)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

//! Condition tree evaluation shared by WHERE and HAVING
//!
//! A condition config is a map of `field -> value | [operator, value]`
//! pairs, combined with implicit AND. `"AND"` / `"OR"` keys (any case)
//! introduce explicit boolean grouping and nest to arbitrary depth.
//! Supported comparison operators: `=, !=, <>, >, <, >=, <=`; a bare value
//! compares with `=`.
//!
//! Comparison is deliberately coercive: heterogeneous sources (JSON vs XML
//! vs user input) routinely deliver `"42"` where a number is meant, so when
//! one operand is a number and the other a numeric string, the string is
//! normalized to a number before comparing. Everything else compares
//! structurally.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use serde_json::Value;
use std::cmp::Ordering;

/// Resolves a condition field name to a value for the item under test
pub trait FieldResolver {
    /// Value of `field` for the current item, `None` when absent
    fn field(&mut self, field: &str) -> Option<Value>;

    /// Resolve the expected (right-hand) config value
    fn expected(&mut self, value: &Value) -> Result<Value>;
}

/// Evaluate a condition tree against one item
pub fn evaluate(condition: &Value, resolver: &mut dyn FieldResolver) -> Result<bool> {
    match condition {
        Value::Object(map) => {
            // Sibling keys combine with implicit AND. Only the AND/OR
            // detection is case-insensitive; field names keep their case.
            for (key, value) in map {
                let matched = match key.to_uppercase().as_str() {
                    "AND" => evaluate_branches(value, resolver, true)?,
                    "OR" => evaluate_branches(value, resolver, false)?,
                    _ => evaluate_field(key, value, resolver)?,
                };
                if !matched {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Value::Array(conditions) => {
            for nested in conditions {
                if !evaluate(nested, resolver)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        other => Err(Error::configuration_in(
            format!("condition must be an object or array, got {}", type_name(other)),
            "condition evaluation",
        )),
    }
}

/// Evaluate an AND/OR group: a list of sub-conditions, or an object whose
/// entries each count as one sub-condition
fn evaluate_branches(group: &Value, resolver: &mut dyn FieldResolver, all: bool) -> Result<bool> {
    match group {
        Value::Array(branches) => {
            for branch in branches {
                let matched = evaluate(branch, resolver)?;
                if all && !matched {
                    return Ok(false);
                }
                if !all && matched {
                    return Ok(true);
                }
            }
            Ok(all)
        }
        Value::Object(map) => {
            for (key, value) in map {
                let matched = match key.to_uppercase().as_str() {
                    "AND" => evaluate_branches(value, resolver, true)?,
                    "OR" => evaluate_branches(value, resolver, false)?,
                    _ => evaluate_field(key, value, resolver)?,
                };
                if all && !matched {
                    return Ok(false);
                }
                if !all && matched {
                    return Ok(true);
                }
            }
            Ok(all)
        }
        other => Err(Error::configuration_in(
            format!("AND/OR group must be an object or array, got {}", type_name(other)),
            "condition evaluation",
        )),
    }
}

/// Evaluate one `field -> value | [operator, value]` pair
fn evaluate_field(field: &str, spec: &Value, resolver: &mut dyn FieldResolver) -> Result<bool> {
    let (operator, expected_raw) = match spec {
        Value::Array(parts) if parts.len() == 2 => {
            let op = parts[0].as_str().ok_or_else(|| {
                Error::configuration_in(
                    format!("comparison operator for '{}' must be a string", field),
                    "condition evaluation",
                )
            })?;
            (op, &parts[1])
        }
        other => ("=", other),
    };

    let expected = resolver.expected(expected_raw)?;
    let actual = resolver.field(field).unwrap_or(Value::Null);
    compare(&actual, operator, &expected)
}

/// Apply a comparison operator with coercive semantics
pub fn compare(actual: &Value, operator: &str, expected: &Value) -> Result<bool> {
    match operator {
        "=" | "==" => Ok(loose_equal(actual, expected)),
        "!=" | "<>" => Ok(!loose_equal(actual, expected)),
        ">" => Ok(loose_cmp(actual, expected) == Some(Ordering::Greater)),
        "<" => Ok(loose_cmp(actual, expected) == Some(Ordering::Less)),
        ">=" => Ok(matches!(
            loose_cmp(actual, expected),
            Some(Ordering::Greater) | Some(Ordering::Equal)
        )),
        "<=" => Ok(matches!(
            loose_cmp(actual, expected),
            Some(Ordering::Less) | Some(Ordering::Equal)
        )),
        other => Err(Error::configuration_in(
            format!("unsupported comparison operator '{}'", other),
            "condition evaluation",
        )),
    }
}

/// Numeric view of a value: numbers directly, numeric strings parsed,
/// booleans as 0/1
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(*b as u8 as f64),
        _ => None,
    }
}

/// Coercive equality: numeric comparison when both sides have a numeric
/// view and at least one side is an actual number, structural otherwise
pub fn loose_equal(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }
    if left.is_number() || right.is_number() {
        if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
            return (l - r).abs() < f64::EPSILON;
        }
    }
    false
}

/// Coercive ordering: numeric when both sides have a numeric view, string
/// ordering for string pairs, booleans false < true
pub fn loose_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
        return l.partial_cmp(&r);
    }
    match (left, right) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

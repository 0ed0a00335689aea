//! ORDER BY operator
//!
//! Config is an ordered map `fieldExpr -> "ASC" | "DESC"`. Sorting is a
//! stable multi-key sort: ties on the first key are broken by subsequent
//! keys in declaration order, and a full tie preserves the items' original
//! relative order. Values of different JSON types order by type class
//! (null < bool < number < string), mirroring the comparison rules used by
//! WHERE.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use super::condition::loose_cmp;
use super::OperatorContext;
use crate::error::{Error, Result};
use crate::path::{self, PathValue};
use crate::wildcard::WildcardResult;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Direction {
    Asc,
    Desc,
}

/// Apply an ORDER BY config to the collection
pub fn apply(
    items: WildcardResult,
    config: &Value,
    ctx: &mut OperatorContext,
) -> Result<WildcardResult> {
    let spec = match config {
        Value::Object(map) => map,
        Value::String(field) => {
            // Single bare field defaults to ascending.
            let mut entries = items.into_entries();
            let field = field.clone();
            entries.sort_by(|(ka, a), (kb, b)| {
                let left = field_value(a, &field, ctx, ka);
                let right = field_value(b, &field, ctx, kb);
                compare_values(&left, &right)
            });
            return Ok(WildcardResult::from_entries(entries));
        }
        other => {
            return Err(Error::configuration_in(
                format!("ORDER BY config must be an object or field name, got {}", other),
                "ORDER BY",
            ))
        }
    };

    let mut keys: Vec<(String, Direction)> = Vec::with_capacity(spec.len());
    for (field, direction) in spec {
        let direction = match direction.as_str().map(str::to_uppercase).as_deref() {
            Some("ASC") | None => Direction::Asc,
            Some("DESC") => Direction::Desc,
            Some(other) => {
                return Err(Error::configuration_in(
                    format!("ORDER BY direction for '{}' must be ASC or DESC, got '{}'", field, other),
                    "ORDER BY",
                ))
            }
        };
        keys.push((field.clone(), direction));
    }

    let mut entries = items.into_entries();
    // Vec::sort_by is stable, so a full tie keeps original relative order.
    entries.sort_by(|(ka, a), (kb, b)| {
        for (field, direction) in &keys {
            let left = field_value(a, field, ctx, ka);
            let right = field_value(b, field, ctx, kb);
            let ordering = compare_values(&left, &right);
            let ordering = match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });

    Ok(WildcardResult::from_entries(entries))
}

fn field_value(
    item: &Value,
    field: &str,
    ctx: &OperatorContext,
    key: &crate::wildcard::WildcardKey,
) -> Value {
    if field.split('.').any(|seg| seg == "*") {
        let concrete = field.replacen('*', &key.substitution(), 1);
        ctx.lookup(&concrete)
            .map(PathValue::into_single)
            .unwrap_or(Value::Null)
    } else {
        path::get(item, field)
            .map(PathValue::into_single)
            .unwrap_or(Value::Null)
    }
}

/// Total ordering over JSON values: type class first, value within class
fn compare_values(left: &Value, right: &Value) -> Ordering {
    if let Some(ordering) = loose_cmp(left, right) {
        return ordering;
    }
    let rank = |v: &Value| match v {
        Value::Null => 0u8,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    };
    rank(left).cmp(&rank(right))
}

//! DISTINCT operator
//!
//! Config `true` dedups whole items by structural equality; a field path
//! dedups by the resolved field value. First occurrence wins either way.
//! Equality is exact (serialized-value identity), not the coercive
//! comparison WHERE uses.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use super::OperatorContext;
use crate::error::{Error, Result};
use crate::path::{self, PathValue};
use crate::wildcard::WildcardResult;
use serde_json::Value;
use std::collections::HashSet;

/// Apply a DISTINCT config to the collection
pub fn apply(
    items: WildcardResult,
    config: &Value,
    _ctx: &mut OperatorContext,
) -> Result<WildcardResult> {
    let field = match config {
        Value::Bool(true) => None,
        Value::Bool(false) => return Ok(items),
        Value::String(field) => Some(field.as_str()),
        other => {
            return Err(Error::configuration_in(
                format!("DISTINCT config must be true or a field path, got {}", other),
                "DISTINCT",
            ))
        }
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = WildcardResult::new();
    for (key, item) in items {
        let discriminator = match field {
            None => serialize(&item),
            Some(field) => serialize(
                &path::get(&item, field)
                    .map(PathValue::into_single)
                    .unwrap_or(Value::Null),
            ),
        };
        if seen.insert(discriminator) {
            kept.push(key, item);
        }
    }
    Ok(kept)
}

fn serialize(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

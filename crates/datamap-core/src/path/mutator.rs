//! Dot-path write access
//!
//! The write-side counterpart of the accessor: sets a value at a concrete
//! dot-path, creating intermediate containers on the way down. Numeric
//! segments create arrays (padded with nulls), other segments create
//! objects. Wildcard segments are rejected; fan-out is the mapping engine's
//! job, which expands `*` to concrete indices before calling in here.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use serde_json::Value;

/// Set `value` at `path` inside `target`
pub fn set(target: &mut Value, path: &str, value: Value) -> Result<()> {
    if path.split('.').any(|seg| seg == "*") {
        return Err(Error::configuration_in(
            format!("target path '{}' contains a wildcard; only concrete paths can be written", path),
            "path mutation",
        ));
    }
    if path.is_empty() {
        *target = value;
        return Ok(());
    }

    let segments: Vec<&str> = path.split('.').collect();
    set_segments(target, &segments, value);
    Ok(())
}

fn set_segments(current: &mut Value, segments: &[&str], value: Value) {
    let (segment, rest) = match segments.split_first() {
        Some(pair) => pair,
        None => {
            *current = value;
            return;
        }
    };

    let numeric = !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit());

    // Coerce the current node into a container that can hold the segment.
    // Existing objects keep numeric segments as string keys.
    match current {
        Value::Object(_) => {}
        Value::Array(_) if numeric => {}
        _ => {
            *current = if numeric {
                Value::Array(Vec::new())
            } else {
                Value::Object(serde_json::Map::new())
            };
        }
    }

    match current {
        Value::Object(map) => {
            let slot = map.entry((*segment).to_string()).or_insert(Value::Null);
            set_segments(slot, rest, value);
        }
        Value::Array(array) => {
            // `numeric` guaranteed by the coercion above
            let index: usize = segment.parse().unwrap_or(0);
            if array.len() <= index {
                array.resize(index + 1, Value::Null);
            }
            set_segments(&mut array[index], rest, value);
        }
        _ => unreachable!("node coerced to a container above"),
    }
}

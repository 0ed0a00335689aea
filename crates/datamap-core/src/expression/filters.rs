//! Named value filters
//!
//! Filters are pure, total functions from value to value, applied in the
//! order they appear after the path (`{{ name | trim | upper }}`). A filter
//! that does not apply to the value's type passes the value through
//! unchanged; an unregistered filter name is an error surfaced to the
//! caller, never silently ignored.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;

/// A single value filter
pub type FilterFn = fn(&Value) -> Value;

/// Registry of named filters
///
/// Stateless and safe to share across resolutions. `Default` installs the
/// built-in filters; callers may register their own on top.
#[derive(Clone)]
pub struct FilterRegistry {
    filters: HashMap<String, FilterFn>,
}

impl FilterRegistry {
    /// Create an empty registry with no filters installed
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Register a filter under a (case-insensitive) name
    pub fn register(&mut self, name: impl Into<String>, filter: FilterFn) {
        self.filters.insert(name.into().to_lowercase(), filter);
    }

    /// Check whether a filter is registered
    pub fn has(&self, name: &str) -> bool {
        self.filters.contains_key(&name.to_lowercase())
    }

    /// Apply a chain of filters in order
    pub fn apply(&self, value: Value, names: &[String]) -> Result<Value> {
        let mut current = value;
        for name in names {
            let filter = self
                .filters
                .get(&name.to_lowercase())
                .ok_or_else(|| Error::UnknownFilter { name: name.clone() })?;
            current = filter(&current);
        }
        Ok(current)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("upper", upper);
        registry.register("lower", lower);
        registry.register("trim", trim);
        registry.register("capitalize", capitalize);
        registry.register("length", length);
        registry.register("abs", abs);
        registry.register("round", round);
        registry.register("first", first);
        registry.register("last", last);
        registry.register("keys", keys);
        registry.register("values", values);
        registry.register("string", to_string);
        registry.register("number", to_number);
        registry
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.filters.keys().collect();
        names.sort();
        f.debug_struct("FilterRegistry").field("filters", &names).finish()
    }
}

fn upper(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_uppercase()),
        other => other.clone(),
    }
}

fn lower(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other.clone(),
    }
}

fn trim(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other.clone(),
    }
}

fn capitalize(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            let mut chars = s.chars();
            let capitalized = match chars.next() {
                Some(head) => head.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            };
            Value::String(capitalized)
        }
        other => other.clone(),
    }
}

fn length(value: &Value) -> Value {
    let len = match value {
        Value::String(s) => s.chars().count(),
        Value::Array(array) => array.len(),
        Value::Object(map) => map.len(),
        _ => return value.clone(),
    };
    Value::Number(serde_json::Number::from(len))
}

fn abs(value: &Value) -> Value {
    match value.as_f64() {
        Some(n) => number_value(n.abs()),
        None => value.clone(),
    }
}

fn round(value: &Value) -> Value {
    match value.as_f64() {
        Some(n) => number_value(n.round()),
        None => value.clone(),
    }
}

fn first(value: &Value) -> Value {
    match value {
        Value::Array(array) => array.first().cloned().unwrap_or(Value::Null),
        Value::String(s) => s
            .chars()
            .next()
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null),
        other => other.clone(),
    }
}

fn last(value: &Value) -> Value {
    match value {
        Value::Array(array) => array.last().cloned().unwrap_or(Value::Null),
        Value::String(s) => s
            .chars()
            .last()
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null),
        other => other.clone(),
    }
}

fn keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Array(map.keys().map(|k| Value::String(k.clone())).collect()),
        other => other.clone(),
    }
}

fn values(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Array(map.values().cloned().collect()),
        Value::Array(array) => Value::Array(array.clone()),
        other => other.clone(),
    }
}

fn to_string(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        Value::Null => Value::String(String::new()),
        other => Value::String(other.to_string()),
    }
}

fn to_number(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(number_value)
            .unwrap_or(Value::Null),
        Value::Bool(b) => Value::Number(serde_json::Number::from(*b as u64)),
        _ => Value::Null,
    }
}

/// Build a JSON number, preferring integer representation
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(serde_json::Number::from(n as i64))
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

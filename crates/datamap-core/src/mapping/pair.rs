//! Mapping pair construction
//!
//! The write path works from `(target path, source)` pairs. Callers hand in
//! one of two shapes: a flat map of `targetPath -> sourceExprOrLiteral`
//! (nested target objects flatten to dot-paths), or the structured form, a
//! list of definition objects with optional `source`/`target` prefixes and
//! either a relative `mapping` or paired `sourceMapping`/`targetMapping`
//! arrays.
//!
//! A string value wrapped in `{{ ... }}` is a source expression; anything
//! else is a static literal written verbatim.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::expression::{self, ParsedExpression};
use serde_json::Value;

/// Where a pair's value comes from
#[derive(Debug, Clone, PartialEq)]
pub enum PairSource {
    /// Looked up in the source registry
    Expression(ParsedExpression),
    /// Written as-is, no source lookup
    Literal(Value),
}

/// One write: a target path and the value to put there
#[derive(Debug, Clone, PartialEq)]
pub struct MappingPair {
    pub target_path: String,
    pub source: PairSource,
}

impl MappingPair {
    fn from_leaf(target_path: String, leaf: &Value) -> Result<Self> {
        let source = match leaf {
            Value::String(text) if expression::is_expression(text) => {
                PairSource::Expression(expression::parse(text)?)
            }
            other => PairSource::Literal(other.clone()),
        };
        Ok(Self {
            target_path,
            source,
        })
    }

    /// The source dot-path, when this pair reads from a source
    pub fn source_path(&self) -> &str {
        match &self.source {
            PairSource::Expression(parsed) => &parsed.path,
            PairSource::Literal(_) => "",
        }
    }
}

/// A group of pairs sharing source and target path prefixes
///
/// The flat form produces a single entry with empty prefixes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MappingEntry {
    pub source_prefix: String,
    pub target_prefix: String,
    pub pairs: Vec<MappingPair>,
}

/// Build pairs from a flat (possibly nested) `target -> source` map
pub fn pairs_from_flat(mapping: &Value) -> Result<Vec<MappingPair>> {
    let map = mapping.as_object().ok_or_else(|| {
        Error::configuration_in(
            format!("flat mapping must be an object, got {}", mapping),
            "mapping",
        )
    })?;
    let mut pairs = Vec::new();
    flatten_into(map, "", &mut pairs)?;
    Ok(pairs)
}

fn flatten_into(
    map: &serde_json::Map<String, Value>,
    prefix: &str,
    pairs: &mut Vec<MappingPair>,
) -> Result<()> {
    for (key, value) in map {
        let target_path = join_path(prefix, key);
        match value {
            Value::Object(nested) => flatten_into(nested, &target_path, pairs)?,
            leaf => pairs.push(MappingPair::from_leaf(target_path, leaf)?),
        }
    }
    Ok(())
}

/// Build entries from the structured list-of-definitions form
pub fn entries_from_structured(definitions: &Value) -> Result<Vec<MappingEntry>> {
    let list = definitions.as_array().ok_or_else(|| {
        Error::configuration_in(
            format!("structured mapping must be an array, got {}", definitions),
            "mapping",
        )
    })?;

    let mut entries = Vec::with_capacity(list.len());
    for definition in list {
        let def = definition.as_object().ok_or_else(|| {
            Error::configuration_in(
                format!("structured mapping entry must be an object, got {}", definition),
                "mapping",
            )
        })?;

        let source_prefix = string_field(def, "source")?.unwrap_or_default();
        let target_prefix = string_field(def, "target")?.unwrap_or_default();

        let pairs = match (def.get("mapping"), def.get("sourceMapping"), def.get("targetMapping")) {
            (Some(mapping), None, None) => pairs_from_flat(mapping)?,
            (None, Some(from), Some(to)) => paired_lists(from, to)?,
            (None, None, None) => Vec::new(),
            _ => {
                return Err(Error::configuration_in(
                    "entry must carry either 'mapping' or 'sourceMapping' with 'targetMapping'",
                    "mapping",
                ))
            }
        };

        entries.push(MappingEntry {
            source_prefix,
            target_prefix,
            pairs,
        });
    }
    Ok(entries)
}

/// Zip `sourceMapping`/`targetMapping` arrays into pairs
fn paired_lists(from: &Value, to: &Value) -> Result<Vec<MappingPair>> {
    let from = string_list(from, "sourceMapping")?;
    let to = string_list(to, "targetMapping")?;
    if from.len() != to.len() {
        return Err(Error::configuration_in(
            format!(
                "sourceMapping has {} entries but targetMapping has {}",
                from.len(),
                to.len()
            ),
            "mapping",
        ));
    }

    from.into_iter()
        .zip(to)
        .map(|(source, target)| {
            let parsed = if expression::is_expression(&source) {
                expression::parse(&source)?
            } else {
                ParsedExpression::path_only(source)
            };
            Ok(MappingPair {
                target_path: target,
                source: PairSource::Expression(parsed),
            })
        })
        .collect()
}

fn string_field(
    def: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<String>> {
    match def.get(key) {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(other) => Err(Error::configuration_in(
            format!("'{}' must be a string path, got {}", key, other),
            "mapping",
        )),
    }
}

fn string_list(value: &Value, key: &str) -> Result<Vec<String>> {
    let list = value.as_array().ok_or_else(|| {
        Error::configuration_in(format!("'{}' must be an array of paths", key), "mapping")
    })?;
    list.iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                Error::configuration_in(
                    format!("'{}' entries must be strings, got {}", key, item),
                    "mapping",
                )
            })
        })
        .collect()
}

/// Join two dot-paths, tolerating empty sides
pub fn join_path(prefix: &str, rest: &str) -> String {
    match (prefix.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{}.{}", prefix, rest),
    }
}

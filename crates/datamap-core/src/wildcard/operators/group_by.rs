//! GROUP BY operator with aggregation and HAVING
//!
//! Config: `{field | fields, aggregations?, HAVING?}`. Items partition by
//! the composite key of all group fields; the partition key is the
//! serialized key tuple, so distinct tuples can never collide the way a
//! numeric hash could. Each group reduces to one row carrying the group
//! fields plus the configured aggregates.
//!
//! After grouping, the aggregated rows are re-injected into the working
//! source map under the originating alias, so later operators in the same
//! block and template expressions referencing the alias see the aggregated
//! rows instead of the raw items. HAVING then filters the rows with the
//! same comparison semantics as WHERE, resolving fields against the
//! aggregated row only.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use super::condition::{self, as_number, loose_cmp, FieldResolver};
use super::OperatorContext;
use crate::error::{Error, Result};
use crate::path::{self, PathValue};
use crate::wildcard::{WildcardKey, WildcardResult};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// One aggregation: function applied to a field within each group
#[derive(Debug, Clone, PartialEq)]
enum Aggregation {
    Count(Option<String>),
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
    First(String),
    Last(String),
    Collect(String),
    Concat { field: String, separator: String },
}

/// Apply a GROUP BY config to the collection
pub fn apply(
    items: WildcardResult,
    config: &Value,
    ctx: &mut OperatorContext,
) -> Result<WildcardResult> {
    let spec = match config {
        Value::Object(map) => map,
        Value::String(field) => {
            // Bare field shorthand: group with no aggregations.
            let mut shorthand = serde_json::Map::new();
            shorthand.insert("field".to_string(), Value::String(field.clone()));
            return apply(items, &Value::Object(shorthand), ctx);
        }
        other => {
            return Err(Error::configuration_in(
                format!("GROUP BY config must be an object or field name, got {}", other),
                "GROUP BY",
            ))
        }
    };

    let mut fields: Vec<String> = Vec::new();
    let mut aggregations: Vec<(String, Aggregation)> = Vec::new();
    let mut having: Option<&Value> = None;

    for (key, value) in spec {
        match key.to_uppercase().as_str() {
            "FIELD" => {
                let field = value.as_str().ok_or_else(|| {
                    Error::configuration_in("GROUP BY 'field' must be a string", "GROUP BY")
                })?;
                fields.push(field.to_string());
            }
            "FIELDS" => match value {
                Value::Array(list) => {
                    for entry in list {
                        let field = entry.as_str().ok_or_else(|| {
                            Error::configuration_in("GROUP BY 'fields' must be strings", "GROUP BY")
                        })?;
                        fields.push(field.to_string());
                    }
                }
                Value::String(field) => fields.push(field.clone()),
                other => {
                    return Err(Error::configuration_in(
                        format!("GROUP BY 'fields' must be an array, got {}", other),
                        "GROUP BY",
                    ))
                }
            },
            "AGGREGATIONS" => {
                let map = value.as_object().ok_or_else(|| {
                    Error::configuration_in("GROUP BY 'aggregations' must be an object", "GROUP BY")
                })?;
                for (output, agg_spec) in map {
                    aggregations.push((output.clone(), parse_aggregation(agg_spec)?));
                }
            }
            "HAVING" => having = Some(value),
            other => {
                return Err(Error::configuration_in(
                    format!("unrecognized GROUP BY key '{}'", other),
                    "GROUP BY",
                ))
            }
        }
    }

    if fields.is_empty() {
        return Err(Error::configuration_in(
            "GROUP BY requires at least one group field",
            "GROUP BY",
        ));
    }

    // Partition, preserving first-seen group order. The composite key is
    // the serialized tuple of group-field values.
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Value>> = HashMap::new();
    for (key, item) in items {
        let tuple: Vec<Value> = fields
            .iter()
            .map(|field| group_field_value(&item, field, ctx, &key))
            .collect();
        let composite = serde_json::to_string(&tuple).unwrap_or_default();
        if !groups.contains_key(&composite) {
            order.push(composite.clone());
        }
        groups.entry(composite).or_default().push(item);
    }

    // Reduce each group to one row.
    let mut rows = WildcardResult::new();
    for (index, composite) in order.iter().enumerate() {
        let members = &groups[composite];
        let mut row = serde_json::Map::new();

        for field in &fields {
            let value = field_value(&members[0], field);
            row.insert(output_key(field), value);
        }
        for (output, aggregation) in &aggregations {
            row.insert(output.clone(), aggregate(aggregation, members));
        }
        rows.push(WildcardKey::Index(index), Value::Object(row));
    }

    reinject(&rows, ctx)?;

    if let Some(having) = having {
        let mut kept = WildcardResult::new();
        for (index, (_, row)) in rows.into_iter().enumerate() {
            let mut resolver = HavingResolver { ctx, row: &row };
            if condition::evaluate(having, &mut resolver)? {
                kept.push(WildcardKey::Index(index), row);
            }
        }
        // Reindex survivors and publish the post-HAVING rows.
        let kept: WildcardResult = kept
            .into_iter()
            .enumerate()
            .map(|(i, (_, row))| (WildcardKey::Index(i), row))
            .collect();
        reinject(&kept, ctx)?;
        return Ok(kept);
    }

    Ok(rows)
}

/// HAVING resolves fields against the aggregated row's own keys only
struct HavingResolver<'a, 'b> {
    ctx: &'a OperatorContext<'b>,
    row: &'a Value,
}

impl FieldResolver for HavingResolver<'_, '_> {
    fn field(&mut self, field: &str) -> Option<Value> {
        path::get(self.row, field).map(PathValue::into_single)
    }

    fn expected(&mut self, value: &Value) -> Result<Value> {
        self.ctx.resolve_config(value)
    }
}

/// Write the aggregated rows back into the working source map so later
/// operators and expressions see them under the original alias
fn reinject(rows: &WildcardResult, ctx: &mut OperatorContext) -> Result<()> {
    if !rows.values().all(Value::is_object) {
        return Ok(());
    }
    let Some(root) = ctx.sources.get_mut(ctx.alias) else {
        return Ok(());
    };
    let replacement = Value::Array(rows.values().cloned().collect());
    path::set(root, ctx.base_path, replacement)
}

fn parse_aggregation(spec: &Value) -> Result<Aggregation> {
    let text = spec.as_str().ok_or_else(|| {
        Error::configuration_in(
            format!("aggregation spec must be a string like 'SUM(field)', got {}", spec),
            "GROUP BY",
        )
    })?;

    let (name, args) = match text.find('(') {
        Some(open) => {
            let close = text.rfind(')').ok_or_else(|| {
                Error::configuration_in(format!("unbalanced parentheses in '{}'", text), "GROUP BY")
            })?;
            (text[..open].trim(), text[open + 1..close].trim())
        }
        None => (text.trim(), ""),
    };

    let field = || -> Result<String> {
        if args.is_empty() {
            Err(Error::configuration_in(
                format!("aggregation '{}' requires a field argument", name),
                "GROUP BY",
            ))
        } else {
            Ok(args.to_string())
        }
    };

    match name.to_uppercase().as_str() {
        "COUNT" => Ok(Aggregation::Count(match args {
            "" | "*" => None,
            field => Some(field.to_string()),
        })),
        "SUM" => Ok(Aggregation::Sum(field()?)),
        "AVG" => Ok(Aggregation::Avg(field()?)),
        "MIN" => Ok(Aggregation::Min(field()?)),
        "MAX" => Ok(Aggregation::Max(field()?)),
        "FIRST" => Ok(Aggregation::First(field()?)),
        "LAST" => Ok(Aggregation::Last(field()?)),
        "COLLECT" => Ok(Aggregation::Collect(field()?)),
        "CONCAT" => {
            let (field, separator) = match args.split_once(',') {
                Some((field, sep)) => (field.trim().to_string(), unquote(sep.trim())),
                None => (field()?, ", ".to_string()),
            };
            Ok(Aggregation::Concat { field, separator })
        }
        other => Err(Error::configuration_in(
            format!("unknown aggregation function '{}'", other),
            "GROUP BY",
        )),
    }
}

fn unquote(text: &str) -> String {
    let bytes = text.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

fn aggregate(aggregation: &Aggregation, members: &[Value]) -> Value {
    match aggregation {
        Aggregation::Count(None) => number(members.len() as f64),
        Aggregation::Count(Some(field)) => {
            let count = members
                .iter()
                .filter(|item| !field_value(item, field).is_null())
                .count();
            number(count as f64)
        }
        Aggregation::Sum(field) => number(numeric_values(members, field).sum()),
        Aggregation::Avg(field) => {
            let values: Vec<f64> = numeric_values(members, field).collect();
            if values.is_empty() {
                Value::Null
            } else {
                number(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        Aggregation::Min(field) => extremum(members, field, Ordering::Less),
        Aggregation::Max(field) => extremum(members, field, Ordering::Greater),
        Aggregation::First(field) => field_value(&members[0], field),
        Aggregation::Last(field) => field_value(members.last().unwrap_or(&Value::Null), field),
        Aggregation::Collect(field) => Value::Array(
            members
                .iter()
                .map(|item| field_value(item, field))
                .filter(|v| !v.is_null())
                .collect(),
        ),
        Aggregation::Concat { field, separator } => {
            let parts: Vec<String> = members
                .iter()
                .map(|item| field_value(item, field))
                .filter(|v| !v.is_null())
                .map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect();
            Value::String(parts.join(separator))
        }
    }
}

fn numeric_values<'a>(members: &'a [Value], field: &'a str) -> impl Iterator<Item = f64> + 'a {
    members
        .iter()
        .filter_map(move |item| as_number(&field_value(item, field)))
}

fn extremum(members: &[Value], field: &str, wanted: Ordering) -> Value {
    let mut best: Option<Value> = None;
    for item in members {
        let candidate = field_value(item, field);
        if candidate.is_null() {
            continue;
        }
        best = match best {
            None => Some(candidate),
            Some(current) => {
                if loose_cmp(&candidate, &current) == Some(wanted) {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.unwrap_or(Value::Null)
}

fn field_value(item: &Value, field: &str) -> Value {
    path::get(item, field)
        .map(PathValue::into_single)
        .unwrap_or(Value::Null)
}

/// Group-field resolution mirrors WHERE: wildcard paths go through the
/// sources with `*` replaced by the item's position
fn group_field_value(
    item: &Value,
    field: &str,
    ctx: &OperatorContext,
    key: &WildcardKey,
) -> Value {
    if field.split('.').any(|seg| seg == "*") {
        let concrete = field.replacen('*', &key.substitution(), 1);
        ctx.lookup(&concrete)
            .map(PathValue::into_single)
            .unwrap_or(Value::Null)
    } else {
        field_value(item, field)
    }
}

/// Output key for a group field: the last path segment
fn output_key(field: &str) -> String {
    field.rsplit('.').next().unwrap_or(field).to_string()
}

fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(serde_json::Number::from(n as i64))
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

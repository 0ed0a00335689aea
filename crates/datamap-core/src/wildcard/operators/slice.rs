//! LIMIT and OFFSET operators
//!
//! Plain slices over the collection. Negative or out-of-range values clamp
//! to the valid range instead of erroring. LIMIT also accepts the SQL-style
//! two-element form `[offset, count]`, which applies the offset before the
//! count within a single operator.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use super::OperatorContext;
use crate::error::{Error, Result};
use crate::wildcard::WildcardResult;
use serde_json::Value;

/// Apply a LIMIT config: `n` or `[offset, count]`
pub fn limit(
    items: WildcardResult,
    config: &Value,
    ctx: &mut OperatorContext,
) -> Result<WildcardResult> {
    let config = ctx.resolve_config(config)?;
    let (skip, count) = match &config {
        Value::Array(parts) if parts.len() == 2 => (
            clamped(&parts[0], "LIMIT offset")?,
            clamped(&parts[1], "LIMIT count")?,
        ),
        other => (0, clamped(other, "LIMIT")?),
    };

    Ok(items.into_iter().skip(skip).take(count).collect())
}

/// Apply an OFFSET config: skip the first `n` items
pub fn offset(
    items: WildcardResult,
    config: &Value,
    ctx: &mut OperatorContext,
) -> Result<WildcardResult> {
    let config = ctx.resolve_config(config)?;
    let skip = clamped(&config, "OFFSET")?;
    Ok(items.into_iter().skip(skip).collect())
}

/// Read a count, clamping negatives to zero
fn clamped(value: &Value, what: &str) -> Result<usize> {
    let n = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        Error::configuration_in(format!("{} must be a number, got {}", what, value), "slice")
    })?;
    Ok(n.max(0) as usize)
}

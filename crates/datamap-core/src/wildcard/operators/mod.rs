//! Query operators over wildcard collections
//!
//! Operators post-process a normalized wildcard collection before the
//! template rows are produced: filtering (WHERE, LIKE), ordering (ORDER BY),
//! slicing (LIMIT, OFFSET), deduplication (DISTINCT) and aggregation
//! (GROUP BY with HAVING). They execute in the order they appear in the
//! template's operator block, each consuming and producing a
//! [`WildcardResult`].
//!
//! Operator names normalize before lookup (uppercased, spaces and
//! underscores stripped), so `"order by"`, `"ORDER_BY"` and `"ORDERBY"` all
//! address the same operator. Custom operators register through
//! [`OperatorRegistry::register`].
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

pub mod condition;
pub mod distinct;
pub mod group_by;
pub mod like;
pub mod order_by;
pub mod slice;
pub mod where_op;

use crate::error::{Error, Result};
use crate::expression::{self, FilterRegistry};
use crate::path::{self, PathValue};
use crate::wildcard::WildcardResult;
use crate::SourceMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Context handed to each operator invocation
///
/// `alias` and `base_path` identify where the wildcard items were read from
/// (`data.users.*` → alias `data`, base path `users`), which GROUP BY uses
/// to re-inject aggregated rows into the working source map.
pub struct OperatorContext<'a> {
    /// Working copy of the source registry, mutable for re-injection
    pub sources: &'a mut SourceMap,
    /// Alias table accumulated so far during resolution
    pub aliases: &'a SourceMap,
    /// Source alias the wildcard items came from
    pub alias: &'a str,
    /// Path from the alias root to the wildcard list ("" when the alias
    /// itself is the list)
    pub base_path: &'a str,
    /// Filter registry for expressions embedded in operator configs
    pub filters: &'a FilterRegistry,
}

impl<'a> OperatorContext<'a> {
    /// Resolve `{{ ... }}` expressions embedded in an operator config value,
    /// against sources first and aliases second. Non-expression values pass
    /// through; objects and arrays resolve recursively.
    pub fn resolve_config(&self, config: &Value) -> Result<Value> {
        match config {
            Value::String(s) if expression::is_expression(s) => {
                let parsed = expression::parse(s)?;
                let raw = self
                    .lookup(&parsed.path)
                    .map(PathValue::into_single)
                    .or(parsed.default.clone())
                    .unwrap_or(Value::Null);
                self.filters.apply(raw, &parsed.filters)
            }
            Value::Array(items) => {
                let resolved: Result<Vec<Value>> =
                    items.iter().map(|item| self.resolve_config(item)).collect();
                Ok(Value::Array(resolved?))
            }
            Value::Object(map) => {
                let mut resolved = serde_json::Map::new();
                for (key, value) in map {
                    resolved.insert(key.clone(), self.resolve_config(value)?);
                }
                Ok(Value::Object(resolved))
            }
            other => Ok(other.clone()),
        }
    }

    /// Look up a dot-path against sources first, aliases second
    pub fn lookup(&self, full_path: &str) -> Option<PathValue> {
        let path = full_path.strip_prefix('@').unwrap_or(full_path);
        let (name, rest) = match path.split_once('.') {
            Some((name, rest)) => (name, rest),
            None => (path, ""),
        };

        if let Some(root) = self.sources.get(name) {
            if let Some(found) = path::get(root, rest) {
                return Some(found);
            }
        }
        self.aliases.get(name).and_then(|root| path::get(root, rest))
    }
}

/// An operator: transforms one wildcard collection into another
pub type OperatorFn =
    Arc<dyn Fn(WildcardResult, &Value, &mut OperatorContext) -> Result<WildcardResult> + Send + Sync>;

/// Registry of named wildcard operators
///
/// Stateless and safe to share across resolutions. `Default` installs the
/// built-in operators.
#[derive(Clone)]
pub struct OperatorRegistry {
    operators: HashMap<String, OperatorFn>,
}

impl OperatorRegistry {
    /// Create an empty registry with no operators installed
    pub fn empty() -> Self {
        Self {
            operators: HashMap::new(),
        }
    }

    /// Canonical form of an operator name: uppercase, spaces and
    /// underscores stripped
    pub fn normalize_name(name: &str) -> String {
        name.chars()
            .filter(|c| *c != ' ' && *c != '_')
            .flat_map(|c| c.to_uppercase())
            .collect()
    }

    /// Register an operator under a name
    pub fn register<F>(&mut self, name: &str, operator: F)
    where
        F: Fn(WildcardResult, &Value, &mut OperatorContext) -> Result<WildcardResult>
            + Send
            + Sync
            + 'static,
    {
        self.operators
            .insert(Self::normalize_name(name), Arc::new(operator));
    }

    /// Check whether a name addresses a registered operator
    pub fn has(&self, name: &str) -> bool {
        self.operators.contains_key(&Self::normalize_name(name))
    }

    /// Fetch an operator by name
    pub fn get(&self, name: &str) -> Result<OperatorFn> {
        self.operators
            .get(&Self::normalize_name(name))
            .cloned()
            .ok_or_else(|| Error::UnknownOperator {
                name: name.to_string(),
            })
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("WHERE", where_op::apply);
        registry.register("ORDER BY", order_by::apply);
        registry.register("LIMIT", slice::limit);
        registry.register("OFFSET", slice::offset);
        registry.register("DISTINCT", distinct::apply);
        registry.register("LIKE", like::apply);
        registry.register("GROUP BY", group_by::apply);
        registry
    }
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.operators.keys().collect();
        names.sort();
        f.debug_struct("OperatorRegistry")
            .field("operators", &names)
            .finish()
    }
}

//! Template resolution
//!
//! The resolver walks a parsed [`TemplateNode`] tree and produces the output
//! record. Each object level runs a two-phase pass: phase one resolves every
//! entry except alias references (paths starting with `@`, or bare dot-free
//! names that match no source), accumulating resolved siblings into a scope
//! that nested objects inherit. Phase two loops over the deferred alias
//! references, resolving whichever referents have become available, until
//! nothing is pending or an iteration makes no progress. At that point the
//! leftovers are classified: a reference whose referent is itself still
//! pending is a genuine cycle and a configuration error; a reference to a
//! name that exists nowhere follows the missing-path policy instead of
//! silently going null.
//!
//! Wildcard blocks resolve their item collection once, run the operator
//! pipeline over it in declared order, then re-resolve the item template per
//! surviving key with `*` substituted by that key's position.
//!
//! The resolver itself is stateless and shareable; every `resolve` call
//! works on a private clone of the source registry (the GROUP BY feedback
//! loop mutates it) and a per-call alias scope, so concurrent calls against
//! one resolver are safe without locks.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use super::template::TemplateNode;
use crate::error::{Error, ErrorCollector, ErrorPolicy, Result};
use crate::expression::{self, FilterRegistry, ParsedExpression};
use crate::path::{self, PathValue};
use crate::wildcard::{normalize, OperatorContext, OperatorRegistry, WildcardResult};
use crate::SourceMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Behavior switches for one resolution run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Drop object keys whose resolved value is null
    pub skip_null: bool,
    /// Emit wildcard block output as a dense array; when off, an object
    /// keyed by the surviving original keys
    pub reindex_wildcards: bool,
    /// Raise [`Error::UndefinedValue`] for missing source paths instead of
    /// quietly resolving to null
    pub fail_on_undefined: bool,
    /// Collected-vs-immediate error delivery
    pub policy: ErrorPolicy,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            skip_null: false,
            reindex_wildcards: true,
            fail_on_undefined: false,
            policy: ErrorPolicy::FailFast,
        }
    }
}

impl ResolveOptions {
    pub fn with_skip_null(mut self, on: bool) -> Self {
        self.skip_null = on;
        self
    }

    pub fn with_reindex_wildcards(mut self, on: bool) -> Self {
        self.reindex_wildcards = on;
        self
    }

    pub fn with_fail_on_undefined(mut self, on: bool) -> Self {
        self.fail_on_undefined = on;
        self
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Template resolver over an operator and filter registry
///
/// Holds no per-call state; construct once and reuse.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    operators: &'a OperatorRegistry,
    filters: &'a FilterRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(operators: &'a OperatorRegistry, filters: &'a FilterRegistry) -> Self {
        Self { operators, filters }
    }

    /// Resolve a template against a source registry
    pub fn resolve(
        &self,
        template: &Value,
        sources: &SourceMap,
        options: &ResolveOptions,
    ) -> Result<Value> {
        let parsed = TemplateNode::parse(template, self.operators)?;
        log::debug!(
            "resolving template against {} source(s), policy {:?}",
            sources.len(),
            options.policy
        );

        let mut run = Run {
            operators: self.operators,
            filters: self.filters,
            sources: sources.clone(),
            options,
            collector: ErrorCollector::new(options.policy),
            stars: Vec::new(),
        };
        let root = Scope {
            current: SourceMap::new(),
            parent: None,
        };
        let value = run.node(&parsed, &root)?;
        run.collector.finish()?;
        Ok(value)
    }
}

/// Alias visibility chain: the in-progress result at each object level
struct Scope<'p> {
    current: SourceMap,
    parent: Option<&'p Scope<'p>>,
}

impl Scope<'_> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.current
            .get(name)
            .or_else(|| self.parent.and_then(|p| p.lookup(name)))
    }

    /// Snapshot of the whole chain, inner levels shadowing outer ones
    fn flatten(&self) -> SourceMap {
        let mut map = self.parent.map(Scope::flatten).unwrap_or_default();
        for (key, value) in &self.current {
            map.insert(key.clone(), value.clone());
        }
        map
    }
}

/// State for one resolution run
struct Run<'a> {
    operators: &'a OperatorRegistry,
    filters: &'a FilterRegistry,
    sources: SourceMap,
    options: &'a ResolveOptions,
    collector: ErrorCollector,
    /// Substitutions for `*` segments, one per enclosing wildcard block
    stars: Vec<String>,
}

impl Run<'_> {
    fn node(&mut self, node: &TemplateNode, scope: &Scope) -> Result<Value> {
        match node {
            TemplateNode::Literal(value) => Ok(value.clone()),
            TemplateNode::Expression(text) => {
                let parsed = expression::parse(text)?;
                self.eval(&parsed, scope)
            }
            TemplateNode::Object(entries) => self.object(entries, scope),
            TemplateNode::Array(items) => {
                let resolved: Result<Vec<Value>> =
                    items.iter().map(|item| self.node(item, scope)).collect();
                Ok(Value::Array(resolved?))
            }
            TemplateNode::WildcardBlock { item, operators } => {
                self.block(item, operators, scope)
            }
        }
    }

    /// Two-phase resolution of one object level
    fn object(&mut self, entries: &[(String, TemplateNode)], parent: &Scope) -> Result<Value> {
        let mut scope = Scope {
            current: SourceMap::new(),
            parent: Some(parent),
        };
        let mut output = SourceMap::new();
        let mut pending: Vec<(String, ParsedExpression)> = Vec::new();

        for (key, node) in entries {
            if let TemplateNode::Expression(text) = node {
                let parsed = expression::parse(text)?;
                if self.defers(&parsed) {
                    // Placeholder keeps the key's declaration position.
                    output.insert(key.clone(), Value::Null);
                    pending.push((key.clone(), parsed));
                    continue;
                }
            }
            let value = self.node(node, &scope)?;
            scope.current.insert(key.clone(), value.clone());
            output.insert(key.clone(), value);
        }

        loop {
            // Alias fixpoint: resolve whatever the current scope allows.
            loop {
                let mut progress = false;
                let mut still = Vec::new();
                for (key, parsed) in pending {
                    match self.try_alias(&parsed, &scope)? {
                        Some(value) => {
                            scope.current.insert(key.clone(), value.clone());
                            output.insert(key, value);
                            progress = true;
                        }
                        None => still.push((key, parsed)),
                    }
                }
                pending = still;
                if !progress {
                    break;
                }
            }
            if pending.is_empty() {
                break;
            }

            // No entry can make progress. Settle the ones whose referent
            // exists nowhere via the default/missing-path policy and feed
            // them back into the scope; a chain ending in a missing name
            // then drains one link per round. Only entries that are left
            // referencing each other are a real cycle.
            let stuck: HashSet<String> = pending.iter().map(|(key, _)| key.clone()).collect();
            let mut still = Vec::new();
            let mut settled = false;
            for (key, parsed) in pending {
                if stuck.contains(referent_name(&parsed)) {
                    still.push((key, parsed));
                    continue;
                }
                let value = match &parsed.default {
                    Some(default) => self.filters.apply(default.clone(), &parsed.filters)?,
                    None => self.missing(&parsed.path)?,
                };
                scope.current.insert(key.clone(), value.clone());
                output.insert(key, value);
                settled = true;
            }
            pending = still;
            if !settled {
                for (key, parsed) in &pending {
                    self.collector.report(Error::configuration_in(
                        format!(
                            "circular alias reference: '{}' depends on '{}', which is still unresolved",
                            key,
                            referent_name(parsed)
                        ),
                        "resolve",
                    ))?;
                }
                break;
            }
        }

        if self.options.skip_null {
            output.retain(|_, value| !value.is_null());
        }
        Ok(Value::Object(output))
    }

    /// True when an expression must wait for the alias table
    fn defers(&self, parsed: &ParsedExpression) -> bool {
        parsed.is_alias_reference()
            || (parsed.is_bare_name() && !self.sources.contains_key(&parsed.path))
    }

    /// Attempt a deferred alias reference; `None` when the referent has not
    /// resolved yet
    fn try_alias(&mut self, parsed: &ParsedExpression, scope: &Scope) -> Result<Option<Value>> {
        let path = parsed.path.strip_prefix('@').unwrap_or(&parsed.path);
        let (name, rest) = split_root(path);
        let Some(root) = scope.lookup(name) else {
            return Ok(None);
        };
        let found = path::get(root, rest);
        let value = self.finish(found, parsed, path)?;
        Ok(Some(value))
    }

    /// Evaluate a parsed expression against sources and the alias scope
    fn eval(&mut self, parsed: &ParsedExpression, scope: &Scope) -> Result<Value> {
        let concrete = self.substitute(&parsed.path);
        let found = self.lookup(&concrete, scope);
        self.finish(found, parsed, &concrete)
    }

    /// Shared tail of expression evaluation: defaults, missing-path policy,
    /// filter chain
    fn finish(
        &mut self,
        found: Option<PathValue>,
        parsed: &ParsedExpression,
        path: &str,
    ) -> Result<Value> {
        let value = match found {
            Some(PathValue::Single(value)) => value,
            Some(PathValue::Wildcard(raw)) => {
                normalize(raw).into_value(self.options.reindex_wildcards)
            }
            None => match &parsed.default {
                Some(default) => default.clone(),
                None => self.missing(path)?,
            },
        };
        let value = match (&value, &parsed.default) {
            (Value::Null, Some(default)) => default.clone(),
            _ => value,
        };
        self.filters.apply(value, &parsed.filters)
    }

    /// Missing-path policy: null, or reported as undefined when enabled
    fn missing(&mut self, path: &str) -> Result<Value> {
        if self.options.fail_on_undefined {
            let (name, _) = split_root(path.strip_prefix('@').unwrap_or(path));
            self.collector
                .report(Error::undefined(path, name))?;
        }
        Ok(Value::Null)
    }

    /// Dot-path lookup: explicit `@` goes to the alias scope; otherwise
    /// sources first, alias scope second
    fn lookup(&self, full: &str, scope: &Scope) -> Option<PathValue> {
        if let Some(alias_path) = full.strip_prefix('@') {
            let (name, rest) = split_root(alias_path);
            return scope.lookup(name).and_then(|root| path::get(root, rest));
        }
        let (name, rest) = split_root(full);
        if let Some(root) = self.sources.get(name) {
            if let Some(found) = path::get(root, rest) {
                return Some(found);
            }
        }
        scope.lookup(name).and_then(|root| path::get(root, rest))
    }

    /// Replace `*` segments with the substitutions of enclosing wildcard
    /// blocks, outermost first; extra `*`s stay for plain wildcard expansion
    fn substitute(&self, path: &str) -> String {
        if self.stars.is_empty() || !path.contains('*') {
            return path.to_string();
        }
        let mut stars = self.stars.iter();
        path.split('.')
            .map(|seg| {
                if seg == "*" {
                    stars.next().map(String::as_str).unwrap_or("*")
                } else {
                    seg
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Resolve a wildcard block: expand, pipeline, re-resolve per survivor
    fn block(
        &mut self,
        item: &TemplateNode,
        operators: &[(String, Value)],
        scope: &Scope,
    ) -> Result<Value> {
        let wild_path = item.first_wildcard_path().ok_or_else(|| {
            Error::configuration_in(
                "wildcard block item template contains no wildcard expression",
                "template",
            )
        })?;
        let substituted = self.substitute(&wild_path);
        let segments: Vec<&str> = substituted.split('.').collect();
        let star = segments
            .iter()
            .position(|seg| *seg == "*")
            .filter(|star| *star > 0)
            .ok_or_else(|| {
                Error::configuration_in(
                    format!("cannot derive an item collection from '{}'", substituted),
                    "template",
                )
            })?;
        let source_path = segments[..star].join(".");
        let collection_path = format!("{}.*", source_path);

        let raw = match self.lookup(&collection_path, scope) {
            Some(PathValue::Wildcard(raw)) => raw,
            Some(PathValue::Single(value)) => {
                return Err(Error::configuration_in(
                    format!("'{}' is not a collection: {}", source_path, value),
                    "template",
                ))
            }
            None => {
                self.missing(&collection_path)?;
                WildcardResult::new()
            }
        };
        let mut items = normalize(raw);
        log::debug!(
            "wildcard block over '{}': {} item(s), {} operator(s)",
            source_path,
            items.len(),
            operators.len()
        );

        if !operators.is_empty() {
            let (alias, base_path) = split_root(&source_path);
            let aliases = scope.flatten();
            for (name, config) in operators {
                let operator = self.operators.get(name)?;
                let mut ctx = OperatorContext {
                    sources: &mut self.sources,
                    aliases: &aliases,
                    alias,
                    base_path,
                    filters: self.filters,
                };
                items = operator(items, config, &mut ctx)?;
            }
        }

        let mut rows = WildcardResult::new();
        for (key, _) in items {
            self.stars.push(key.substitution());
            let row = self.node(item, scope);
            self.stars.pop();
            let row = row?;
            if !row.is_null() {
                rows.push(key, row);
            }
        }
        Ok(rows.into_value(self.options.reindex_wildcards))
    }
}

fn split_root(path: &str) -> (&str, &str) {
    match path.split_once('.') {
        Some((name, rest)) => (name, rest),
        None => (path, ""),
    }
}

/// Top-level name a deferred alias reference points at
fn referent_name(parsed: &ParsedExpression) -> &str {
    let path = parsed.path.strip_prefix('@').unwrap_or(&parsed.path);
    split_root(path).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> (OperatorRegistry, FilterRegistry) {
        (OperatorRegistry::default(), FilterRegistry::default())
    }

    fn sources() -> SourceMap {
        let mut map = SourceMap::new();
        map.insert(
            "user".to_string(),
            json!({"name": "ada", "age": 36, "email": null}),
        );
        map.insert(
            "data".to_string(),
            json!({
                "users": [
                    {"name": "Ann", "age": 34, "city": "Oslo"},
                    {"name": "Bob", "age": 17, "city": "Bergen"},
                    {"name": "Cleo", "age": 51, "city": "Oslo"}
                ]
            }),
        );
        map
    }

    fn resolve(template: Value) -> Value {
        resolve_with(template, &ResolveOptions::default())
    }

    fn resolve_with(template: Value, options: &ResolveOptions) -> Value {
        let (ops, filters) = engine();
        Resolver::new(&ops, &filters)
            .resolve(&template, &sources(), options)
            .unwrap()
    }

    #[test]
    fn test_literals_and_expressions() {
        let output = resolve(json!({
            "tag": "fixed",
            "count": 3,
            "who": "{{ user.name | upper }}",
            "years": "{{ user.age }}"
        }));
        assert_eq!(
            output,
            json!({"tag": "fixed", "count": 3, "who": "ADA", "years": 36})
        );
    }

    #[test]
    fn test_default_for_missing_and_null() {
        let output = resolve(json!({
            "nick": "{{ user.nick ?? anonymous }}",
            "mail": "{{ user.email ?? none }}"
        }));
        assert_eq!(output, json!({"nick": "anonymous", "mail": "none"}));
    }

    #[test]
    fn test_alias_forward_reference() {
        // "copy" references the sibling "profile" declared after it.
        let output = resolve(json!({
            "copy": "{{ @profile.name }}",
            "profile": {"name": "{{ user.name }}"}
        }));
        assert_eq!(
            output,
            json!({"copy": "ada", "profile": {"name": "ada"}})
        );
    }

    #[test]
    fn test_bare_name_alias_reference() {
        let output = resolve(json!({
            "mirror": "{{ profile }}",
            "profile": {"name": "{{ user.name }}"}
        }));
        assert_eq!(output["mirror"], json!({"name": "ada"}));
    }

    #[test]
    fn test_chained_forward_references() {
        let output = resolve(json!({
            "a": "{{ @b }}",
            "b": "{{ @c }}",
            "c": "{{ user.age }}"
        }));
        assert_eq!(output, json!({"a": 36, "b": 36, "c": 36}));
    }

    #[test]
    fn test_alias_cycle_is_an_error() {
        let (ops, filters) = engine();
        let err = Resolver::new(&ops, &filters)
            .resolve(
                &json!({"a": "{{ @b }}", "b": "{{ @a }}"}),
                &sources(),
                &ResolveOptions::default(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn test_chain_to_missing_name_is_not_a_cycle() {
        // A non-cyclic chain ending in a name that exists nowhere follows
        // the missing-path policy link by link instead of erroring.
        let output = resolve(json!({"a": "{{ @b }}", "b": "{{ @ghost }}"}));
        assert_eq!(output, json!({"a": null, "b": null}));

        let output = resolve(json!({"a": "{{ @b }}", "b": "{{ @ghost ?? fallback }}"}));
        assert_eq!(output, json!({"a": "fallback", "b": "fallback"}));
    }

    #[test]
    fn test_unresolvable_alias_goes_null_by_default() {
        let output = resolve(json!({"ghost": "{{ @nothing.here }}"}));
        assert_eq!(output, json!({"ghost": null}));
    }

    #[test]
    fn test_fail_on_undefined() {
        let (ops, filters) = engine();
        let options = ResolveOptions::default().with_fail_on_undefined(true);
        let err = Resolver::new(&ops, &filters)
            .resolve(&json!({"x": "{{ user.ghost }}"}), &sources(), &options)
            .unwrap_err();
        assert!(matches!(err, Error::UndefinedValue { .. }));
    }

    #[test]
    fn test_skip_null_drops_keys() {
        let options = ResolveOptions::default().with_skip_null(true);
        let output = resolve_with(
            json!({"mail": "{{ user.email }}", "name": "{{ user.name }}"}),
            &options,
        );
        assert_eq!(output, json!({"name": "ada"}));
    }

    #[test]
    fn test_wildcard_block_plain() {
        let output = resolve(json!({
            "people": {
                "*": {"who": "{{ data.users.*.name }}"}
            }
        }));
        assert_eq!(
            output["people"],
            json!([{"who": "Ann"}, {"who": "Bob"}, {"who": "Cleo"}])
        );
    }

    #[test]
    fn test_wildcard_block_where_and_order() {
        let output = resolve(json!({
            "adults": {
                "*": {"who": "{{ data.users.*.name }}"},
                "WHERE": {"age": [">=", 18]},
                "ORDER BY": {"name": "DESC"}
            }
        }));
        assert_eq!(output["adults"], json!([{"who": "Cleo"}, {"who": "Ann"}]));
    }

    #[test]
    fn test_wildcard_block_without_reindex_keeps_keys() {
        let options = ResolveOptions::default().with_reindex_wildcards(false);
        let output = resolve_with(
            json!({
                "adults": {
                    "*": {"who": "{{ data.users.*.name }}"},
                    "WHERE": {"age": [">=", 18]}
                }
            }),
            &options,
        );
        // Bob (index 1) filtered out; surviving original indices kept.
        assert_eq!(
            output["adults"],
            json!({"0": {"who": "Ann"}, "2": {"who": "Cleo"}})
        );
    }

    #[test]
    fn test_wildcard_block_group_by_feedback() {
        let output = resolve(json!({
            "cities": {
                "*": {
                    "city": "{{ data.users.*.city }}",
                    "heads": "{{ data.users.*.n }}"
                },
                "GROUP BY": {"field": "city", "aggregations": {"n": "COUNT"}}
            }
        }));
        assert_eq!(
            output["cities"],
            json!([
                {"city": "Oslo", "heads": 2},
                {"city": "Bergen", "heads": 1}
            ])
        );
    }

    #[test]
    fn test_operator_config_expression() {
        let mut src = sources();
        src.insert("limits".to_string(), json!({"adult": 18}));
        let (ops, filters) = engine();
        let output = Resolver::new(&ops, &filters)
            .resolve(
                &json!({
                    "grown": {
                        "*": {"who": "{{ data.users.*.name }}"},
                        "WHERE": {"age": [">=", "{{ limits.adult }}"]}
                    }
                }),
                &src,
                &ResolveOptions::default(),
            )
            .unwrap();
        assert_eq!(output["grown"], json!([{"who": "Ann"}, {"who": "Cleo"}]));
    }

    #[test]
    fn test_unknown_operator_key_rejected() {
        let (ops, filters) = engine();
        let err = Resolver::new(&ops, &filters)
            .resolve(
                &json!({"x": {"*": "{{ data.users.*.name }}", "SELECT": 1}}),
                &sources(),
                &ResolveOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_sibling_order_does_not_change_leaves() {
        let forward = resolve(json!({"a": "{{ user.name }}", "b": "{{ user.age }}"}));
        let backward = resolve(json!({"b": "{{ user.age }}", "a": "{{ user.name }}"}));
        assert_eq!(forward["a"], backward["a"]);
        assert_eq!(forward["b"], backward["b"]);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let template = json!({
            "adults": {
                "*": {"who": "{{ data.users.*.name }}"},
                "WHERE": {"age": [">=", 18]},
                "ORDER BY": {"name": "ASC"}
            },
            "alias": "{{ @adults }}"
        });
        let first = resolve(template.clone());
        let second = resolve(template);
        assert_eq!(first, second);
    }
}

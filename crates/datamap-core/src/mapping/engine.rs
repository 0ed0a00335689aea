//! Mapping engine: the write path
//!
//! Applies mapping entries to a target value, one pair at a time. For each
//! pair the order is fixed: value lookup, default substitution, filter
//! chain, null check (so a default can still populate an otherwise-null
//! value before `skip_null` strikes), then the transform hooks, then the
//! write. `beforePair` gates can veto a pair outright; `beforeWrite` can
//! veto the write after transforms ran.
//!
//! A wildcard source value fans out on the write side: when the target path
//! carries no `*`, all items collect into a single array written once; when
//! it does, each item writes individually at the expanded target path.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use super::pair::{join_path, MappingEntry, MappingPair, PairSource};
use crate::error::{Error, ErrorCollector, ErrorPolicy, Result};
use crate::expression::{FilterRegistry, ParsedExpression};
use crate::hooks::{HookContext, HookEvent, HookPipeline, HookVerdict};
use crate::path::{self, PathValue};
use crate::wildcard::{normalize, WildcardResult};
use crate::SourceMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Behavior switches for one mapping run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Do not write pairs whose value is null after filters
    pub skip_null: bool,
    /// Raise [`Error::UndefinedValue`] for missing source paths and missing
    /// target parent paths
    pub fail_on_undefined: bool,
    /// Collected-vs-immediate error delivery
    pub policy: ErrorPolicy,
    /// Mapping mode fed to `mode:` hook filters (`simple`, `structured`, ...)
    pub mode: String,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            skip_null: false,
            fail_on_undefined: false,
            policy: ErrorPolicy::FailFast,
            mode: "simple".to_string(),
        }
    }
}

impl MapOptions {
    pub fn with_skip_null(mut self, on: bool) -> Self {
        self.skip_null = on;
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

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }
}

/// The mapping engine; stateless over a filter registry
#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    filters: &'a FilterRegistry,
}

/// Source value after lookup, before the write-side fan-out decision
enum Resolved {
    One(Value),
    Many(WildcardResult),
}

impl<'a> Engine<'a> {
    pub fn new(filters: &'a FilterRegistry) -> Self {
        Self { filters }
    }

    /// Apply mapping entries to `target`, returning the written target
    pub fn apply(
        &self,
        sources: &SourceMap,
        target: Value,
        entries: &[MappingEntry],
        hooks: &HookPipeline,
        options: &MapOptions,
    ) -> Result<Value> {
        let mut target = target;
        let mut collector = ErrorCollector::new(options.policy);
        log::debug!(
            "applying {} mapping entr(ies) in mode '{}'",
            entries.len(),
            options.mode
        );

        let run_ctx = |event| HookContext::new(event, "", "", &options.mode);
        hooks.notify(HookEvent::BeforeAll, &run_ctx(HookEvent::BeforeAll), &mut target);

        for entry in entries {
            let entry_ctx = |event| {
                HookContext::new(event, &entry.source_prefix, &entry.target_prefix, &options.mode)
            };
            hooks.notify(HookEvent::BeforeEntry, &entry_ctx(HookEvent::BeforeEntry), &mut target);

            for pair in &entry.pairs {
                self.pair(sources, &mut target, entry, pair, hooks, options, &mut collector)?;
            }

            hooks.notify(HookEvent::AfterEntry, &entry_ctx(HookEvent::AfterEntry), &mut target);
        }

        hooks.notify(HookEvent::AfterAll, &run_ctx(HookEvent::AfterAll), &mut target);
        collector.finish()?;
        Ok(target)
    }

    #[allow(clippy::too_many_arguments)]
    fn pair(
        &self,
        sources: &SourceMap,
        target: &mut Value,
        entry: &MappingEntry,
        pair: &MappingPair,
        hooks: &HookPipeline,
        options: &MapOptions,
        collector: &mut ErrorCollector,
    ) -> Result<()> {
        let source_path = join_path(&entry.source_prefix, pair.source_path());
        let target_path = join_path(&entry.target_prefix, &pair.target_path);
        let ctx = HookContext::new(HookEvent::BeforePair, &source_path, &target_path, &options.mode);

        if !hooks.gate(&ctx) {
            log::trace!("pair '{}' vetoed by beforePair", target_path);
            return Ok(());
        }

        let resolved = match &pair.source {
            PairSource::Literal(value) => Resolved::One(value.clone()),
            PairSource::Expression(parsed) => {
                self.resolve(sources, parsed, &source_path, options, collector)?
            }
        };

        match resolved {
            Resolved::One(value) => {
                let defaults = pair_defaults(&pair.source);
                self.write(value, defaults, &source_path, &target_path, target, hooks, options, collector)?;
            }
            Resolved::Many(items) if target_path.split('.').any(|seg| seg == "*") => {
                let defaults = pair_defaults(&pair.source);
                for (key, item) in items {
                    let concrete = target_path.replacen('*', &key.substitution(), 1);
                    self.write(item, defaults, &source_path, &concrete, target, hooks, options, collector)?;
                }
            }
            Resolved::Many(items) => {
                let defaults = pair_defaults(&pair.source);
                self.write(items.into_array(), defaults, &source_path, &target_path, target, hooks, options, collector)?;
            }
        }

        let after = HookContext::new(HookEvent::AfterPair, &source_path, &target_path, &options.mode);
        hooks.notify(HookEvent::AfterPair, &after, target);
        Ok(())
    }

    /// Look up an expression pair's value in the source registry
    fn resolve(
        &self,
        sources: &SourceMap,
        parsed: &ParsedExpression,
        source_path: &str,
        options: &MapOptions,
        collector: &mut ErrorCollector,
    ) -> Result<Resolved> {
        let (name, rest) = match source_path.split_once('.') {
            Some((name, rest)) => (name, rest),
            None => (source_path, ""),
        };
        let found = sources.get(name).and_then(|root| path::get(root, rest));

        match found {
            Some(PathValue::Single(value)) => Ok(Resolved::One(value)),
            Some(PathValue::Wildcard(raw)) => Ok(Resolved::Many(normalize(raw))),
            None => {
                if parsed.default.is_none() && options.fail_on_undefined {
                    collector.report(Error::undefined(source_path, name))?;
                }
                Ok(Resolved::One(Value::Null))
            }
        }
    }

    /// The per-value tail: default, filters, null check, transform hooks,
    /// write with veto, post-write notification
    #[allow(clippy::too_many_arguments)]
    fn write(
        &self,
        value: Value,
        defaults: PairDefaults<'_>,
        source_path: &str,
        target_path: &str,
        target: &mut Value,
        hooks: &HookPipeline,
        options: &MapOptions,
        collector: &mut ErrorCollector,
    ) -> Result<()> {
        let value = match (value, defaults.default) {
            (Value::Null, Some(default)) => default.clone(),
            (value, _) => value,
        };
        let value = self.filters.apply(value, defaults.filters)?;
        if value.is_null() && options.skip_null {
            return Ok(());
        }

        let at = |event| HookContext::new(event, source_path, target_path, &options.mode);
        let mut value = value;
        for event in [
            HookEvent::BeforeTransform,
            HookEvent::AfterTransform,
            HookEvent::BeforeWrite,
        ] {
            value = match hooks.run_value(event, &at(event), value) {
                HookVerdict::Continue(value) => value,
                HookVerdict::Skip => return Ok(()),
            };
        }

        if options.fail_on_undefined {
            if let Some((parent, _)) = target_path.rsplit_once('.') {
                if !path::exists(target, parent) {
                    collector.report(Error::undefined(parent, "target"))?;
                    return Ok(());
                }
            }
        }

        path::set(target, target_path, value)?;
        hooks.notify(HookEvent::AfterWrite, &at(HookEvent::AfterWrite), target);
        Ok(())
    }
}

/// Default and filter chain carried from the pair's expression
#[derive(Clone, Copy)]
struct PairDefaults<'p> {
    default: Option<&'p Value>,
    filters: &'p [String],
}

fn pair_defaults(source: &PairSource) -> PairDefaults<'_> {
    match source {
        PairSource::Expression(parsed) => PairDefaults {
            default: parsed.default.as_ref(),
            filters: &parsed.filters,
        },
        PairSource::Literal(_) => PairDefaults {
            default: None,
            filters: &[],
        },
    }
}

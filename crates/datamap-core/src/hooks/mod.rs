//! Lifecycle hook pipeline
//!
//! The mapping engine announces a fixed lifecycle while it works:
//! `beforeAll, beforeEntry, beforePair, beforeTransform, afterTransform,
//! beforeWrite, afterWrite, afterPair, afterEntry, afterAll`. Callers attach
//! zero or more bindings per event; each binding carries a [`HookFilter`]
//! deciding whether it fires for the current pair (by source-path prefix,
//! target-path prefix, or mapping mode).
//!
//! Events split into three callback classes, separated at the type level so
//! a callback can only be attached where its signature makes sense:
//!
//! - gate (`beforePair`): `Fn(&HookContext) -> bool`. Any matching gate
//!   returning `false` skips the whole pair; no value hook fires for it.
//! - value (`beforeTransform`, `afterTransform`, `beforeWrite`):
//!   `Fn(&HookContext, Value) -> HookVerdict`. Bindings chain, each feeding
//!   the next; [`HookVerdict::Skip`] aborts the current item without error.
//! - notify (the rest): `Fn(&HookContext, &mut Value)`, handed the target
//!   root so `afterWrite` and friends can post-process what was written.
//!
//! Callbacks are not expected to panic for control flow; the engine does not
//! catch panics, they propagate to the caller.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// A point in the mapping lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    BeforeAll,
    BeforeEntry,
    BeforePair,
    BeforeTransform,
    AfterTransform,
    BeforeWrite,
    AfterWrite,
    AfterPair,
    AfterEntry,
    AfterAll,
}

/// Callback class an event accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookClass {
    Gate,
    Value,
    Notify,
}

impl HookEvent {
    /// The callback class this event dispatches
    pub fn class(self) -> HookClass {
        match self {
            Self::BeforePair => HookClass::Gate,
            Self::BeforeTransform | Self::AfterTransform | Self::BeforeWrite => HookClass::Value,
            _ => HookClass::Notify,
        }
    }

    /// Parse a lifecycle event from its camelCase name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "beforeAll" => Some(Self::BeforeAll),
            "beforeEntry" => Some(Self::BeforeEntry),
            "beforePair" => Some(Self::BeforePair),
            "beforeTransform" => Some(Self::BeforeTransform),
            "afterTransform" => Some(Self::AfterTransform),
            "beforeWrite" => Some(Self::BeforeWrite),
            "afterWrite" => Some(Self::AfterWrite),
            "afterPair" => Some(Self::AfterPair),
            "afterEntry" => Some(Self::AfterEntry),
            "afterAll" => Some(Self::AfterAll),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::BeforeAll => "beforeAll",
            Self::BeforeEntry => "beforeEntry",
            Self::BeforePair => "beforePair",
            Self::BeforeTransform => "beforeTransform",
            Self::AfterTransform => "afterTransform",
            Self::BeforeWrite => "beforeWrite",
            Self::AfterWrite => "afterWrite",
            Self::AfterPair => "afterPair",
            Self::AfterEntry => "afterEntry",
            Self::AfterAll => "afterAll",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Predicate deciding whether a binding fires for the current pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookFilter {
    /// Fires unconditionally
    Always,
    /// Fires when the pair's source path starts with the prefix
    SourcePrefix(String),
    /// Fires when the pair's target path starts with the prefix
    TargetPrefix(String),
    /// Fires when the mapping mode matches exactly
    Mode(String),
}

impl HookFilter {
    /// Parse a filter key: `src:<prefix>`, `tgt:<prefix>`, `mode:<name>`.
    /// A trailing `*` on a prefix is redundant (prefixes already match any
    /// suffix) and is stripped.
    pub fn parse(key: &str) -> Result<Self> {
        let filter = if let Some(prefix) = key.strip_prefix("src:") {
            Self::SourcePrefix(strip_star(prefix))
        } else if let Some(prefix) = key.strip_prefix("tgt:") {
            Self::TargetPrefix(strip_star(prefix))
        } else if let Some(mode) = key.strip_prefix("mode:") {
            Self::Mode(mode.to_string())
        } else {
            return Err(Error::configuration_in(
                format!("unrecognized hook filter key '{}'; expected src:, tgt: or mode:", key),
                "hooks",
            ));
        };
        Ok(filter)
    }

    /// Check the filter against the current pair's context
    pub fn matches(&self, ctx: &HookContext) -> bool {
        match self {
            Self::Always => true,
            Self::SourcePrefix(prefix) => ctx.source_path.starts_with(prefix.as_str()),
            Self::TargetPrefix(prefix) => ctx.target_path.starts_with(prefix.as_str()),
            Self::Mode(mode) => ctx.mode == mode,
        }
    }
}

fn strip_star(prefix: &str) -> String {
    prefix.strip_suffix('*').unwrap_or(prefix).to_string()
}

/// What the engine tells a hook about the pair it is working on
///
/// `source_path` and `target_path` are empty for entry-level events
/// (`beforeAll`, `afterEntry`, ...) that fire outside any pair.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub event: HookEvent,
    pub source_path: &'a str,
    pub target_path: &'a str,
    pub mode: &'a str,
}

impl<'a> HookContext<'a> {
    pub fn new(event: HookEvent, source_path: &'a str, target_path: &'a str, mode: &'a str) -> Self {
        Self {
            event,
            source_path,
            target_path,
            mode,
        }
    }
}

/// Outcome of a value hook
#[derive(Debug, Clone, PartialEq)]
pub enum HookVerdict {
    /// Keep going with this (possibly replaced) value
    Continue(Value),
    /// Drop the current item; not an error
    Skip,
}

/// Gate callback (`beforePair`); `false` skips the pair
pub type GateFn = Box<dyn Fn(&HookContext) -> bool + Send + Sync>;
/// Value callback (`beforeTransform`, `afterTransform`, `beforeWrite`)
pub type ValueFn = Box<dyn Fn(&HookContext, Value) -> HookVerdict + Send + Sync>;
/// Notification callback; receives the target root
pub type NotifyFn = Box<dyn Fn(&HookContext, &mut Value) + Send + Sync>;

/// Ordered hook bindings for the mapping lifecycle
///
/// All bindings are lists; an unconditional callback is just a binding with
/// [`HookFilter::Always`]. Bindings for one event fire in registration order.
#[derive(Default)]
pub struct HookPipeline {
    gates: Vec<(HookFilter, GateFn)>,
    values: HashMap<HookEvent, Vec<(HookFilter, ValueFn)>>,
    notifies: HashMap<HookEvent, Vec<(HookFilter, NotifyFn)>>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no bindings are registered at all
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
            && self.values.values().all(Vec::is_empty)
            && self.notifies.values().all(Vec::is_empty)
    }

    /// Attach a `beforePair` gate
    pub fn on_before_pair<F>(&mut self, filter: HookFilter, callback: F) -> &mut Self
    where
        F: Fn(&HookContext) -> bool + Send + Sync + 'static,
    {
        self.gates.push((filter, Box::new(callback)));
        self
    }

    /// Attach a value hook to a value-class event
    pub fn on_value<F>(&mut self, event: HookEvent, filter: HookFilter, callback: F) -> Result<&mut Self>
    where
        F: Fn(&HookContext, Value) -> HookVerdict + Send + Sync + 'static,
    {
        if event.class() != HookClass::Value {
            return Err(Error::configuration_in(
                format!("'{}' is not a value hook", event),
                "hooks",
            ));
        }
        self.values
            .entry(event)
            .or_default()
            .push((filter, Box::new(callback)));
        Ok(self)
    }

    /// Attach a notification hook to a notify-class event
    pub fn on_notify<F>(&mut self, event: HookEvent, filter: HookFilter, callback: F) -> Result<&mut Self>
    where
        F: Fn(&HookContext, &mut Value) + Send + Sync + 'static,
    {
        if event.class() != HookClass::Notify {
            return Err(Error::configuration_in(
                format!("'{}' is not a notification hook", event),
                "hooks",
            ));
        }
        self.notifies
            .entry(event)
            .or_default()
            .push((filter, Box::new(callback)));
        Ok(self)
    }

    /// Run the `beforePair` gates; `false` when any matching gate vetoes
    pub fn gate(&self, ctx: &HookContext) -> bool {
        self.gates
            .iter()
            .filter(|(filter, _)| filter.matches(ctx))
            .all(|(_, gate)| gate(ctx))
    }

    /// Chain the value hooks for an event through `value`
    pub fn run_value(&self, event: HookEvent, ctx: &HookContext, value: Value) -> HookVerdict {
        let Some(bindings) = self.values.get(&event) else {
            return HookVerdict::Continue(value);
        };
        let mut current = value;
        for (filter, callback) in bindings {
            if !filter.matches(ctx) {
                continue;
            }
            match callback(ctx, current) {
                HookVerdict::Continue(next) => current = next,
                HookVerdict::Skip => return HookVerdict::Skip,
            }
        }
        HookVerdict::Continue(current)
    }

    /// Fire the notification hooks for an event
    pub fn notify(&self, event: HookEvent, ctx: &HookContext, target: &mut Value) {
        let Some(bindings) = self.notifies.get(&event) else {
            return;
        };
        for (filter, callback) in bindings {
            if filter.matches(ctx) {
                callback(ctx, target);
            }
        }
    }
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookPipeline")
            .field("gates", &self.gates.len())
            .field("values", &self.values.values().map(Vec::len).sum::<usize>())
            .field("notifies", &self.notifies.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

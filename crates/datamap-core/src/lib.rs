//! Datamap Core - Declarative template resolution and bidirectional data mapping
//!
//! This crate resolves JSON templates against a registry of named sources and
//! writes data into target structures from declarative mapping definitions.
//! Templates combine `{{ path | filters ?? default }}` expressions, alias
//! cross-references, and SQL-flavored wildcard operator blocks (WHERE,
//! ORDER BY, GROUP BY, ...); mappings run the same expressions in the write
//! direction through a lifecycle hook pipeline, and a mapping can be reversed
//! so one definition serves both directions.
//!
//! # Main Components
//!
//! - **Error Handling**: Error taxonomy using `thiserror` and `anyhow`, with
//!   a collected-vs-immediate reporting policy
//! - **Expressions**: `{{ ... }}` leaf parsing and the named filter registry
//! - **Paths**: dot-path read access with `*` wildcard expansion, and the
//!   write-side mutator
//! - **Wildcards**: normalized wildcard collections and the query operator
//!   pipeline
//! - **Resolver**: two-phase template resolution with alias forward
//!   references
//! - **Mapping**: the write path with lifecycle hooks, plus mapping reversal
//!
//! # Example
//!
//! ```
//! use datamap_core::{resolve, Result, SourceMap};
//! use serde_json::json;
//!
//! fn example() -> Result<()> {
//!     let mut sources = SourceMap::new();
//!     sources.insert("user".to_string(), json!({"name": "ada"}));
//!
//!     let output = resolve(&json!({"who": "{{ user.name | upper }}"}), &sources)?;
//!     assert_eq!(output, json!({"who": "ADA"}));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod expression;
pub mod hooks;
pub mod mapping;
pub mod path;
pub mod resolver;
pub mod wildcard;

use serde_json::Value;

/// Registry of named sources: alias name to data tree
///
/// Also the shape of the alias table accumulated during resolution.
pub type SourceMap = serde_json::Map<String, Value>;

// Re-export main types for convenience
pub use error::{Error, ErrorCollector, ErrorPolicy, ExpressionError, Result};
pub use expression::{FilterFn, FilterRegistry, ParsedExpression};
pub use hooks::{
    HookContext, HookEvent, HookFilter, HookPipeline, HookVerdict,
};
pub use mapping::{
    entries_from_structured, pairs_from_flat, reverse, Engine, MapOptions, MappingEntry,
    MappingPair, PairSource,
};
pub use path::PathValue;
pub use resolver::{ResolveOptions, Resolver, TemplateNode};
pub use wildcard::{OperatorContext, OperatorFn, OperatorRegistry, WildcardKey, WildcardResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve a template with the built-in operators, filters, and default
/// options
pub fn resolve(template: &Value, sources: &SourceMap) -> Result<Value> {
    resolve_with(template, sources, &ResolveOptions::default())
}

/// Resolve a template with the built-in operators and filters
pub fn resolve_with(
    template: &Value,
    sources: &SourceMap,
    options: &ResolveOptions,
) -> Result<Value> {
    let operators = OperatorRegistry::default();
    let filters = FilterRegistry::default();
    Resolver::new(&operators, &filters).resolve(template, sources, options)
}

/// Apply a flat `target -> source` mapping to a fresh target with the
/// built-in filters and no hooks
pub fn map_flat(mapping: &Value, sources: &SourceMap) -> Result<Value> {
    let entries = vec![MappingEntry {
        pairs: pairs_from_flat(mapping)?,
        ..MappingEntry::default()
    }];
    let filters = FilterRegistry::default();
    Engine::new(&filters).apply(
        sources,
        Value::Null,
        &entries,
        &HookPipeline::new(),
        &MapOptions::default(),
    )
}

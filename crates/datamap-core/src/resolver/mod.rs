//! Declarative template resolution
//!
//! [`template`] parses a caller-supplied JSON template into a node tree;
//! [`engine`] resolves that tree against a source registry, handling alias
//! forward references and wildcard operator blocks.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

pub mod engine;
pub mod template;

pub use engine::{ResolveOptions, Resolver};
pub use template::TemplateNode;

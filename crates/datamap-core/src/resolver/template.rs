//! Template tree parsing
//!
//! A caller template arrives as a plain JSON value; before resolution it is
//! parsed once into a [`TemplateNode`] tree so malformed shapes surface as
//! configuration errors up front instead of halfway through a resolve. The
//! interesting case is the wildcard block: an object carrying a `"*"` key
//! whose remaining keys must all be registered operator names.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::expression;
use crate::wildcard::OperatorRegistry;
use serde_json::Value;

/// One node of a parsed template tree
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Verbatim value, copied into the output as-is
    Literal(Value),
    /// A `{{ ... }}` leaf, resolved against sources and aliases
    Expression(String),
    /// Nested object; entries keep declaration order
    Object(Vec<(String, TemplateNode)>),
    /// Array of nodes, each resolved independently
    Array(Vec<TemplateNode>),
    /// Operator block: one item template mapped over a wildcard expansion,
    /// post-processed by the named operators in declaration order
    WildcardBlock {
        item: Box<TemplateNode>,
        operators: Vec<(String, Value)>,
    },
}

impl TemplateNode {
    /// Parse a raw template value into a node tree
    ///
    /// The operator registry is consulted to tell a wildcard block's
    /// operator keys apart from typos; an unrecognized sibling of `"*"` is a
    /// configuration error rather than a silently-literal output key.
    pub fn parse(template: &Value, operators: &OperatorRegistry) -> Result<Self> {
        match template {
            Value::String(text) if expression::is_expression(text) => {
                Ok(Self::Expression(text.clone()))
            }
            Value::Object(map) if map.contains_key("*") => {
                let mut item = None;
                let mut ops = Vec::new();
                for (key, value) in map {
                    if key == "*" {
                        item = Some(Self::parse(value, operators)?);
                    } else if operators.has(key) {
                        ops.push((key.clone(), value.clone()));
                    } else {
                        return Err(Error::configuration_in(
                            format!(
                                "'{}' next to a '*' key is not a registered operator",
                                key
                            ),
                            "template",
                        ));
                    }
                }
                let item = item.ok_or_else(|| {
                    Error::configuration_in("wildcard block has no '*' item template", "template")
                })?;
                Ok(Self::WildcardBlock {
                    item: Box::new(item),
                    operators: ops,
                })
            }
            Value::Object(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, value) in map {
                    entries.push((key.clone(), Self::parse(value, operators)?));
                }
                Ok(Self::Object(entries))
            }
            Value::Array(items) => {
                let parsed: Result<Vec<Self>> = items
                    .iter()
                    .map(|item| Self::parse(item, operators))
                    .collect();
                Ok(Self::Array(parsed?))
            }
            other => Ok(Self::Literal(other.clone())),
        }
    }

    /// First expression path containing a wildcard, searching depth-first
    ///
    /// A wildcard block derives its item collection from this path.
    pub fn first_wildcard_path(&self) -> Option<String> {
        match self {
            Self::Expression(text) => {
                let parsed = expression::parse(text).ok()?;
                parsed.has_wildcard().then_some(parsed.path)
            }
            Self::Object(entries) => entries
                .iter()
                .find_map(|(_, node)| node.first_wildcard_path()),
            Self::Array(items) => items.iter().find_map(Self::first_wildcard_path),
            Self::WildcardBlock { item, .. } => item.first_wildcard_path(),
            Self::Literal(_) => None,
        }
    }
}

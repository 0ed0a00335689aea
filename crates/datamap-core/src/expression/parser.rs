//! Leaf expression parsing
//!
//! A template leaf of the form `{{ path | filter1 | filter2 ?? default }}`
//! parses into a path, an ordered filter list, and an optional default. The
//! default is split off first, on the first unescaped `??`; a `\??` stays a
//! literal `??` inside the path. Whatever follows the delimiters verbatim is
//! a literal, so recognizing expressions is a cheap string check.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{ExpressionError, Result};
use serde_json::Value;

/// A parsed `{{ ... }}` expression
///
/// Pure value type, derived deterministically from the expression string;
/// safe to cache by string identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpression {
    /// Dot-path into a source or alias
    pub path: String,
    /// Filter names, applied in order
    pub filters: Vec<String>,
    /// Fallback substituted when the path resolves to null or nothing
    pub default: Option<Value>,
}

impl ParsedExpression {
    /// Build an expression holding only a path
    pub fn path_only(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            filters: Vec::new(),
            default: None,
        }
    }

    /// True when the path is an explicit alias reference (`@name` or
    /// `@parent.child`)
    pub fn is_alias_reference(&self) -> bool {
        self.path.starts_with('@')
    }

    /// True when the path refers to a single name with no segments
    pub fn is_bare_name(&self) -> bool {
        !self.path.contains('.') && !self.path.starts_with('@')
    }

    /// True when the path contains a wildcard segment
    pub fn has_wildcard(&self) -> bool {
        self.path.split('.').any(|seg| seg == "*")
    }
}

/// Check whether a string is a dynamic expression
///
/// True iff the trimmed string starts with `{{` and ends with `}}`.
pub fn is_expression(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.len() >= 4 && trimmed.starts_with("{{") && trimmed.ends_with("}}")
}

/// Parse an expression string into its parts
pub fn parse(input: &str) -> Result<ParsedExpression> {
    let trimmed = input.trim();
    if !is_expression(trimmed) {
        return Err(ExpressionError::Malformed {
            message: "expected '{{ ... }}' delimiters".to_string(),
            input: input.to_string(),
        }
        .into());
    }

    let body = trimmed[2..trimmed.len() - 2].trim();
    if body.is_empty() {
        return Err(ExpressionError::EmptyPath {
            input: input.to_string(),
        }
        .into());
    }

    let (main, default) = match find_unescaped_default(body) {
        Some(at) => {
            let default_text = body[at + 2..].trim();
            (body[..at].trim_end(), Some(parse_default(default_text)))
        }
        None => (body, None),
    };

    let mut segments = main.split('|');
    let path = unescape(segments.next().unwrap_or("").trim());
    if path.is_empty() {
        return Err(ExpressionError::EmptyPath {
            input: input.to_string(),
        }
        .into());
    }

    let mut filters = Vec::new();
    for segment in segments {
        let name = segment.trim();
        if name.is_empty() {
            return Err(ExpressionError::EmptyFilter {
                input: input.to_string(),
            }
            .into());
        }
        filters.push(name.to_string());
    }

    Ok(ParsedExpression {
        path,
        filters,
        default,
    })
}

/// Position of the first `??` not preceded by a backslash
fn find_unescaped_default(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'?' && bytes[i + 1] == b'?' {
            if i == 0 || bytes[i - 1] != b'\\' {
                return Some(i);
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    None
}

fn unescape(text: &str) -> String {
    text.replace("\\??", "??")
}

/// Interpret the default text: JSON literal when it parses as one, bare
/// string otherwise. An empty default means null.
fn parse_default(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(unescape(text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_expression() {
        assert!(is_expression("{{ user.name }}"));
        assert!(is_expression("  {{user.name}}  "));
        assert!(!is_expression("user.name"));
        assert!(!is_expression("{{ unclosed"));
        assert!(!is_expression("{}"));
        assert!(!is_expression("{{}"));
    }

    #[test]
    fn test_bare_path() {
        let parsed = parse("{{ user.name }}").unwrap();
        assert_eq!(parsed.path, "user.name");
        assert!(parsed.filters.is_empty());
        assert_eq!(parsed.default, None);
    }

    #[test]
    fn test_filters_in_order() {
        let parsed = parse("{{ user.name | trim | upper }}").unwrap();
        assert_eq!(parsed.path, "user.name");
        assert_eq!(parsed.filters, vec!["trim", "upper"]);
    }

    #[test]
    fn test_default_values() {
        let parsed = parse("{{ user.age ?? 21 }}").unwrap();
        assert_eq!(parsed.default, Some(json!(21)));

        let parsed = parse("{{ user.nick ?? anonymous }}").unwrap();
        assert_eq!(parsed.default, Some(json!("anonymous")));

        let parsed = parse("{{ user.nick ?? \"quoted name\" }}").unwrap();
        assert_eq!(parsed.default, Some(json!("quoted name")));

        let parsed = parse("{{ user.flag ?? true }}").unwrap();
        assert_eq!(parsed.default, Some(json!(true)));
    }

    #[test]
    fn test_filters_and_default_together() {
        let parsed = parse("{{ user.name | upper ?? UNKNOWN }}").unwrap();
        assert_eq!(parsed.path, "user.name");
        assert_eq!(parsed.filters, vec!["upper"]);
        assert_eq!(parsed.default, Some(json!("UNKNOWN")));
    }

    #[test]
    fn test_escaped_default_marker_stays_literal() {
        let parsed = parse("{{ weird\\??path }}").unwrap();
        assert_eq!(parsed.path, "weird??path");
        assert_eq!(parsed.default, None);
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(parse("{{ }}").is_err());
        assert!(parse("{{ | upper }}").is_err());
    }

    #[test]
    fn test_empty_filter_rejected() {
        assert!(parse("{{ a.b | | upper }}").is_err());
    }

    #[test]
    fn test_alias_and_wildcard_helpers() {
        assert!(parse("{{ @profile.name }}").unwrap().is_alias_reference());
        assert!(parse("{{ profile }}").unwrap().is_bare_name());
        assert!(parse("{{ users.*.email }}").unwrap().has_wildcard());
        assert!(!parse("{{ users.0.email }}").unwrap().has_wildcard());
    }
}

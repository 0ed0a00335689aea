//! Wildcard result collections
//!
//! A wildcard path expansion produces an ordered collection of values keyed
//! by the concrete positions that matched each `*` segment. Keys start out as
//! compound dot-strings straight from traversal and are rewritten to plain
//! integers by the normalizer when that is safe.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use serde_json::Value;
use std::fmt;

/// Key of a single wildcard match
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WildcardKey {
    /// Normalized single-wildcard index
    Index(usize),
    /// Compound dot-path key, e.g. `"0.email"` or `"0.users.1.email"`
    Compound(String),
}

impl WildcardKey {
    /// Number of purely numeric segments in the key
    pub fn numeric_segments(&self) -> usize {
        match self {
            WildcardKey::Index(_) => 1,
            WildcardKey::Compound(s) => s
                .split('.')
                .filter(|seg| !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()))
                .count(),
        }
    }

    /// The first numeric segment, when one exists
    ///
    /// For normalized keys this is the index itself; for compound keys it is
    /// the position matched by the outermost wildcard.
    pub fn leading_index(&self) -> Option<usize> {
        match self {
            WildcardKey::Index(i) => Some(*i),
            WildcardKey::Compound(s) => s
                .split('.')
                .find(|seg| !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|seg| seg.parse().ok()),
        }
    }

    /// True when the key still carries more than one path segment
    pub fn is_compound(&self) -> bool {
        matches!(self, WildcardKey::Compound(s) if s.contains('.'))
    }

    /// The text substituted for `*` in dependent paths
    ///
    /// Compound keys substitute their outermost matched position; object-key
    /// wildcards substitute the map key itself.
    pub fn substitution(&self) -> String {
        match self {
            WildcardKey::Index(i) => i.to_string(),
            WildcardKey::Compound(s) => self
                .leading_index()
                .map(|i| i.to_string())
                .unwrap_or_else(|| s.clone()),
        }
    }
}

impl fmt::Display for WildcardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WildcardKey::Index(i) => write!(f, "{}", i),
            WildcardKey::Compound(s) => write!(f, "{}", s),
        }
    }
}

impl From<usize> for WildcardKey {
    fn from(index: usize) -> Self {
        WildcardKey::Index(index)
    }
}

impl From<&str> for WildcardKey {
    fn from(key: &str) -> Self {
        WildcardKey::Compound(key.to_string())
    }
}

/// Ordered collection of `(key, value)` pairs produced by wildcard expansion
///
/// Insertion order is preserved throughout the operator pipeline; operators
/// consume and produce this type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WildcardResult {
    entries: Vec<(WildcardKey, Value)>,
}

impl WildcardResult {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a result from existing entries
    pub fn from_entries(entries: Vec<(WildcardKey, Value)>) -> Self {
        Self { entries }
    }

    /// Append a matched item
    pub fn push(&mut self, key: WildcardKey, value: Value) {
        self.entries.push((key, value));
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no items matched
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value by key
    pub fn get(&self, key: &WildcardKey) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterate over `(key, value)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = &(WildcardKey, Value)> {
        self.entries.iter()
    }

    /// Iterate over keys in order
    pub fn keys(&self) -> impl Iterator<Item = &WildcardKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Iterate over values in order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Consume the result, yielding the raw entries
    pub fn into_entries(self) -> Vec<(WildcardKey, Value)> {
        self.entries
    }

    /// Collect all values into a plain JSON array, discarding keys
    pub fn into_array(self) -> Value {
        Value::Array(self.entries.into_iter().map(|(_, v)| v).collect())
    }

    /// Convert to a JSON value
    ///
    /// With `reindex` the items become a dense array in surviving order;
    /// without it the original keys are preserved as object keys.
    pub fn into_value(self, reindex: bool) -> Value {
        if reindex {
            self.into_array()
        } else {
            let mut map = serde_json::Map::new();
            for (key, value) in self.entries {
                map.insert(key.to_string(), value);
            }
            Value::Object(map)
        }
    }
}

impl IntoIterator for WildcardResult {
    type Item = (WildcardKey, Value);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(WildcardKey, Value)> for WildcardResult {
    fn from_iter<I: IntoIterator<Item = (WildcardKey, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

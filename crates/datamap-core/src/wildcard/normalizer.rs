//! Wildcard key normalization
//!
//! Traversal hands back compound dot-path keys such as `"0.email"`. Before
//! the operator pipeline runs, single-wildcard collections are collapsed to a
//! clean integer index space. Collections produced by more than one wildcard
//! generation keep their compound keys: collapsing `"0.users.1.email"` and
//! `"1.users.0.email"` to the same integer would silently overwrite sibling
//! items.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use super::result::{WildcardKey, WildcardResult};

/// Normalize a raw wildcard result into a clean index space
///
/// Single pass: first classify every key, then rewrite. If any key carries
/// more than one numeric segment the whole collection stays compound and
/// operators treat keys opaquely (ordering only). If every key carries
/// exactly one numeric segment, each key is rewritten to that segment's
/// integer value. Deterministic regardless of insertion order.
pub fn normalize(raw: WildcardResult) -> WildcardResult {
    let multi_generation = raw.keys().any(|key| key.numeric_segments() > 1);
    if multi_generation {
        return raw;
    }

    let single_indexed = raw.keys().all(|key| key.numeric_segments() == 1);
    if !single_indexed {
        // Object-key wildcards ("alice", "bob") have nothing to rewrite.
        return raw;
    }

    raw.into_iter()
        .map(|(key, value)| match key.leading_index() {
            Some(index) => (WildcardKey::Index(index), value),
            None => (key, value),
        })
        .collect()
}

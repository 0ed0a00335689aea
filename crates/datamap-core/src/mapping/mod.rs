//! Bidirectional data mapping
//!
//! The write-side counterpart of the resolver: [`pair`] turns caller mapping
//! definitions into `(target path, source)` pairs, [`engine`] applies them
//! to a target value through the hook lifecycle, and [`reverser`] derives
//! the opposite-direction mapping from a forward one.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

pub mod engine;
pub mod pair;
pub mod reverser;

pub use engine::{Engine, MapOptions};
pub use pair::{entries_from_structured, pairs_from_flat, MappingEntry, MappingPair, PairSource};
pub use reverser::reverse;

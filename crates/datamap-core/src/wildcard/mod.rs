//! Wildcard collections and their operators
//!
//! A `*` segment in a source path expands to an ordered collection of
//! matches, keyed by where each match sat relative to the wildcard. The
//! [`normalizer`] collapses those keys to plain indices when every match
//! lives exactly one array level deep, and keeps the compound form when the
//! expansion spans nested arrays. [`operators`] holds the query pipeline
//! (WHERE, ORDER BY, GROUP BY and friends) that runs over a collection
//! before template rows are produced.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

pub mod normalizer;
pub mod operators;
pub mod result;

pub use normalizer::normalize;
pub use operators::{OperatorContext, OperatorFn, OperatorRegistry};
pub use result::{WildcardKey, WildcardResult};

//! Dot-path access over JSON values
//!
//! This module provides the read and write collaborators the engine is built
//! on: [`accessor`] resolves dot-paths (with `*` wildcard segments) against a
//! source value, [`mutator`] writes values at concrete paths, creating
//! intermediate containers as needed.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

pub mod accessor;
pub mod mutator;

pub use accessor::{exists, get, PathValue};
pub use mutator::set;

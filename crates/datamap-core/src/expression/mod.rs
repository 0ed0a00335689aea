//! Template leaf expressions
//!
//! Leaves of a template are either literals or dynamic expressions of the
//! form `{{ path | filter1 | filter2 ?? default }}`. [`parser`] turns the
//! string form into a [`ParsedExpression`]; [`filters`] owns the registry of
//! named value filters applied to resolved values.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

pub mod filters;
pub mod parser;

pub use filters::{FilterFn, FilterRegistry};
pub use parser::{is_expression, parse, ParsedExpression};

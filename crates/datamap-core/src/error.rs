//! Error types for the datamap core library
//!
//! This module defines the error taxonomy shared by the whole engine,
//! using thiserror for ergonomic error definitions and anyhow for flexible
//! error sources, together with the collected-vs-immediate reporting policy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for datamap operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed mapping or template shape, unregistered operator names,
    /// mismatched structured-mapping arrays. Always surfaced.
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        context: Option<String>,
    },

    /// A source path or target parent path does not exist.
    ///
    /// Only raised when `fail_on_undefined` is enabled in the options;
    /// with the flag off, missing paths quietly resolve to null.
    #[error("Undefined value: path '{path}' does not exist in source '{source_name}'")]
    UndefinedValue {
        path: String,
        source_name: String,
    },

    /// A filter name was not found in the filter registry.
    #[error("Unknown filter: '{name}'")]
    UnknownFilter {
        name: String,
    },

    /// An operator name was not found in the operator registry.
    #[error("Unknown operator: '{name}'")]
    UnknownOperator {
        name: String,
    },

    /// A value could not be converted to the requested form.
    #[error("Conversion error: {message} at {path}")]
    Conversion {
        message: String,
        path: String,
    },

    /// Expression parsing or evaluation errors
    #[error("Expression error: {source}")]
    Expression {
        #[from]
        source: ExpressionError,
    },

    /// Multiple errors collected during a run
    #[error("{} errors occurred during mapping", .0.len())]
    Multiple(Vec<Error>),

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing or evaluating `{{ ... }}` expressions
#[derive(Error, Debug, Clone)]
pub enum ExpressionError {
    /// The string is not a well-formed expression
    #[error("Malformed expression: {message} in '{input}'")]
    Malformed {
        message: String,
        input: String,
    },

    /// A filter segment between pipes was empty
    #[error("Empty filter segment in '{input}'")]
    EmptyFilter {
        input: String,
    },

    /// The expression body contained no path
    #[error("Expression has no path: '{input}'")]
    EmptyPath {
        input: String,
    },
}

impl Error {
    /// Create a configuration error without extra context
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with a context label
    pub fn configuration_in(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create an undefined-value error
    pub fn undefined(path: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self::UndefinedValue {
            path: path.into(),
            source_name: source_name.into(),
        }
    }
}

/// How raised errors are delivered to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Return the first error immediately
    #[default]
    FailFast,
    /// Collect errors during the run; inspect or re-raise afterwards
    Collect,
}

/// Per-run accumulator implementing the collected-error policy
///
/// Under [`ErrorPolicy::FailFast`] every reported error is returned to the
/// caller on the spot. Under [`ErrorPolicy::Collect`] errors are stored and
/// the run continues; [`ErrorCollector::finish`] re-raises them at the end,
/// a single error directly and several wrapped in [`Error::Multiple`].
#[derive(Debug)]
pub struct ErrorCollector {
    policy: ErrorPolicy,
    errors: Vec<Error>,
}

impl ErrorCollector {
    /// Create a collector for the given policy
    pub fn new(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            errors: Vec::new(),
        }
    }

    /// Report an error according to the policy
    pub fn report(&mut self, error: Error) -> Result<()> {
        match self.policy {
            ErrorPolicy::FailFast => Err(error),
            ErrorPolicy::Collect => {
                log::debug!("collected error: {}", error);
                self.errors.push(error);
                Ok(())
            }
        }
    }

    /// Number of errors collected so far
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when nothing has been collected
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Remove and return all collected errors
    pub fn drain(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.errors)
    }

    /// Finish the run: Ok when nothing was collected, otherwise the
    /// collected error(s)
    pub fn finish(mut self) -> Result<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => match self.errors.pop() {
                Some(error) => Err(error),
                None => Ok(()),
            },
            _ => Err(Error::Multiple(self.errors)),
        }
    }
}

//! Union state error types

use thiserror::Error;

/// Error raised by a fallible reducer when it cannot apply an action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ReduceError {
    message: String,
}

impl ReduceError {
    /// Create a new reducer error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The reducer-supplied message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced to the caller of a dispatch
///
/// A failed dispatch never commits: stored internal state is left untouched
/// and the change callback is not invoked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The reducer failed while folding the batch
    #[error("reducer failed on action {index} of {batch_len}: {source}")]
    Reducer {
        /// Position of the failing action within the batch
        index: usize,
        /// Number of actions in the batch
        batch_len: usize,
        #[source]
        source: ReduceError,
    },
}

/// Errors raised while building a controller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// `UnionStateBuilder::build` was called without a reducer
    #[error("union state requires a reducer")]
    MissingReducer,
}

/// Result type for dispatch operations
pub type Result<T> = std::result::Result<T, DispatchError>;

//! Error types for fieldline-core

use crate::Path;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// An index segment addressed a node that is a map
    #[error("Cannot set a numeric property on a map at {path}")]
    NumericKeyOnMap { path: Path },

    /// A key segment addressed a node that is a list
    #[error("Cannot set a non-numeric property on a list at {path}")]
    KeyOnList { path: Path },

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },
}

impl Error {
    /// Create a type error from the expected and actual type names
    pub fn type_error(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Error::TypeError {
            expected: expected.into(),
            got: got.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

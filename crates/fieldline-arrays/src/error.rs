//! Error types for fieldline-arrays

use thiserror::Error;

/// Result type for array bookkeeping
pub type Result<T> = std::result::Result<T, ArrayError>;

/// Errors raised by the array mutators
///
/// Mutators surface these through [`fieldline_form::Error::Mutator`].
#[derive(Debug, Error)]
pub enum ArrayError {
    /// The field holds something other than a list
    #[error("field {name} holds a {found}, not a list")]
    NotAList { name: String, found: &'static str },

    /// A mutator argument is missing or has the wrong type
    #[error("{mutator} expects {expected} as argument {position}")]
    InvalidArgument {
        mutator: &'static str,
        position: usize,
        expected: &'static str,
    },

    /// The field name could not be turned into a key pattern
    #[error("invalid field key pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl From<ArrayError> for fieldline_form::Error {
    fn from(error: ArrayError) -> Self {
        fieldline_form::Error::mutator(error)
    }
}

fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<ArrayError>();
}

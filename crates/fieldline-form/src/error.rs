//! Error types for fieldline-form

use thiserror::Error;

/// Result type for form operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or driving a form
#[derive(Debug, Error)]
pub enum Error {
    /// Structural store violation while writing values or errors
    #[error("core error: {0}")]
    Core(#[from] fieldline_core::Error),

    /// The form was built without a submit handler
    #[error("no on_submit handler specified")]
    MissingOnSubmit,

    /// `set_config` was called with an option name the form does not know
    #[error("unrecognised option {0}")]
    UnrecognisedOption(String),

    /// `set_config` was called with a value of the wrong kind
    #[error("option {option} expects {expected}")]
    InvalidConfigValue {
        option: String,
        expected: &'static str,
    },

    /// A mutator was invoked by a name that is not registered
    #[error("no mutator named {0}")]
    UnknownMutator(String),

    /// A mutator reported its own failure
    #[error("mutator failed: {0}")]
    Mutator(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The form's executor is already running further up the stack
    #[error("form executor is already running")]
    ExecutorBusy,
}

impl Error {
    /// Wrap a mutator-specific error
    pub fn mutator(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Mutator(Box::new(error))
    }
}

fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}

//! Fieldline Form - reactive form-state engine
//!
//! This crate tracks the state of a form and tells subscribers when the parts
//! they care about change:
//! - Field registration with per-registration validators (`Form::register_field`)
//! - Mask-filtered, memoised notifications (`FormSubscription`, `FieldSubscription`)
//! - Sync and async validation where only the latest run may write errors
//! - Submission with async handlers and deferred completion
//! - Named mutators that rewrite the whole state in one step
//!
//! ## Reentrancy
//!
//! Subscribers, validators and handlers are never called while the form's
//! internal state is borrowed, so any of them may call back into the form.
//! A notification raised from inside a delivery is queued and runs after the
//! current pass instead of recursing. Field `is_equal` predicates are the
//! exception: they run while state is derived and must stay pure.
//!
//! ```
//! use fieldline_core::Value;
//! use fieldline_form::{FieldConfig, FieldSubscription, FormConfig, SubmitResult, Validation};
//!
//! let form = FormConfig::new()
//!     .on_submit(|_, _, _| SubmitResult::Done(None))
//!     .build()
//!     .unwrap();
//!
//! let required = FieldConfig::new().validate(|value, _, _| match value {
//!     Some(_) => Validation::valid(),
//!     None => Validation::error("Required"),
//! });
//! let _email = form
//!     .register_field("email", |_| {}, FieldSubscription::ERROR, Some(required))
//!     .unwrap();
//!
//! assert!(form.get_state().invalid);
//! assert!(form.submit().is_rejected());
//!
//! form.change("email", Value::from("ada@example.com")).unwrap();
//! assert!(form.get_state().valid);
//! assert!(!form.submit().is_rejected());
//! ```

mod config;
mod error;
mod filter;
mod form;
mod mutator;
mod notify;
mod record;
mod sentinel;
mod state;
mod submit;
mod subscription;
mod validation;

pub use config::{
    AfterSubmit, BeforeSubmit, ConfigOption, ConfigValue, DebugCallback, FieldConfig, FormConfig,
};
pub use error::{Error, Result};
pub use filter::{filter_state, Attribute, Snapshot, Update};
pub use form::{FieldHandle, Form, Unsubscribe};
pub use mutator::{BoundMutator, Mutator, Mutators, Tools};
pub use notify::{Memo, SubscriberHub};
pub use record::{
    identity_equal, publish_field_state, FieldHub, FieldRecord, FormRecord, IsEqual, MutableState,
};
pub use sentinel::{
    array_error, form_error, has_any_error, unwrap_array_error, ARRAY_ERROR, FORM_ERROR,
};
pub use state::{filter_field_state, filter_form_state, FieldState, FieldUpdate, FormState};
pub use submit::{OnSubmit, Submission, SubmitCompletion, SubmitResult};
pub use subscription::{FieldSubscription, FormSubscription};
pub use validation::{FieldValidator, RecordValidator, Validation};

//! Published form and field snapshots

use crate::filter::{filter_state, Attribute, Snapshot, Update};
use crate::form::FieldHandle;
use crate::notify::Memo;
use crate::subscription::{FieldSubscription, FormSubscription};
use fieldline_core::Value;
use serde::Serialize;

/// Form-wide state as seen by form subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormState {
    /// Name of the focused field
    pub active: Option<String>,
    pub dirty: bool,
    /// Map of dirty field name to `true`
    pub dirty_fields: Value,
    pub dirty_fields_since_last_submit: Value,
    pub dirty_since_last_submit: bool,
    /// Whole-form validation error
    pub error: Option<Value>,
    /// Validation error tree, shaped like the values
    pub errors: Value,
    pub has_submit_errors: bool,
    pub has_validation_errors: bool,
    pub initial_values: Option<Value>,
    pub invalid: bool,
    /// Map of field name to its modified flag
    pub modified: Value,
    pub modified_since_last_submit: bool,
    pub pristine: bool,
    /// Whole-form submit error
    pub submit_error: Option<Value>,
    pub submit_errors: Option<Value>,
    pub submit_failed: bool,
    pub submit_succeeded: bool,
    pub submitting: bool,
    /// Map of field name to its touched flag
    pub touched: Value,
    pub valid: bool,
    pub validating: bool,
    pub values: Value,
    /// Map of field name to its visited flag
    pub visited: Value,
}

/// One field's state as seen by its subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldState {
    pub name: String,
    pub active: bool,
    /// Free-form metadata attached at registration
    pub data: Value,
    pub dirty: bool,
    pub dirty_since_last_submit: bool,
    pub error: Option<Value>,
    pub initial: Option<Value>,
    pub invalid: bool,
    /// Element count when the value is a list
    pub length: Option<usize>,
    pub modified: bool,
    pub modified_since_last_submit: bool,
    pub pristine: bool,
    pub submit_error: Option<Value>,
    pub submit_failed: bool,
    pub submit_succeeded: bool,
    pub submitting: bool,
    pub touched: bool,
    pub valid: bool,
    pub validating: bool,
    pub value: Option<Value>,
    pub visited: bool,
}

fn opt(value: &Option<Value>) -> Value {
    value.clone().unwrap_or(Value::Null)
}

#[rustfmt::skip]
static FORM_ATTRIBUTES: &[Attribute<FormState>] = &[
    Attribute { flag: FormSubscription::ACTIVE, name: "active", shallow: false, read: |s| s.active.clone().map_or(Value::Null, Value::from) },
    Attribute { flag: FormSubscription::DIRTY, name: "dirty", shallow: false, read: |s| s.dirty.into() },
    Attribute { flag: FormSubscription::DIRTY_FIELDS, name: "dirtyFields", shallow: false, read: |s| s.dirty_fields.clone() },
    Attribute { flag: FormSubscription::DIRTY_FIELDS_SINCE_LAST_SUBMIT, name: "dirtyFieldsSinceLastSubmit", shallow: false, read: |s| s.dirty_fields_since_last_submit.clone() },
    Attribute { flag: FormSubscription::DIRTY_SINCE_LAST_SUBMIT, name: "dirtySinceLastSubmit", shallow: false, read: |s| s.dirty_since_last_submit.into() },
    Attribute { flag: FormSubscription::ERROR, name: "error", shallow: false, read: |s| opt(&s.error) },
    Attribute { flag: FormSubscription::ERRORS, name: "errors", shallow: false, read: |s| s.errors.clone() },
    Attribute { flag: FormSubscription::HAS_SUBMIT_ERRORS, name: "hasSubmitErrors", shallow: false, read: |s| s.has_submit_errors.into() },
    Attribute { flag: FormSubscription::HAS_VALIDATION_ERRORS, name: "hasValidationErrors", shallow: false, read: |s| s.has_validation_errors.into() },
    Attribute { flag: FormSubscription::INITIAL_VALUES, name: "initialValues", shallow: false, read: |s| opt(&s.initial_values) },
    Attribute { flag: FormSubscription::INVALID, name: "invalid", shallow: false, read: |s| s.invalid.into() },
    Attribute { flag: FormSubscription::MODIFIED, name: "modified", shallow: false, read: |s| s.modified.clone() },
    Attribute { flag: FormSubscription::MODIFIED_SINCE_LAST_SUBMIT, name: "modifiedSinceLastSubmit", shallow: false, read: |s| s.modified_since_last_submit.into() },
    Attribute { flag: FormSubscription::PRISTINE, name: "pristine", shallow: false, read: |s| s.pristine.into() },
    Attribute { flag: FormSubscription::SUBMIT_ERROR, name: "submitError", shallow: false, read: |s| opt(&s.submit_error) },
    Attribute { flag: FormSubscription::SUBMIT_ERRORS, name: "submitErrors", shallow: false, read: |s| opt(&s.submit_errors) },
    Attribute { flag: FormSubscription::SUBMIT_FAILED, name: "submitFailed", shallow: false, read: |s| s.submit_failed.into() },
    Attribute { flag: FormSubscription::SUBMIT_SUCCEEDED, name: "submitSucceeded", shallow: false, read: |s| s.submit_succeeded.into() },
    Attribute { flag: FormSubscription::SUBMITTING, name: "submitting", shallow: false, read: |s| s.submitting.into() },
    Attribute { flag: FormSubscription::TOUCHED, name: "touched", shallow: true, read: |s| s.touched.clone() },
    Attribute { flag: FormSubscription::VALID, name: "valid", shallow: false, read: |s| s.valid.into() },
    Attribute { flag: FormSubscription::VALIDATING, name: "validating", shallow: false, read: |s| s.validating.into() },
    Attribute { flag: FormSubscription::VALUES, name: "values", shallow: false, read: |s| s.values.clone() },
    Attribute { flag: FormSubscription::VISITED, name: "visited", shallow: true, read: |s| s.visited.clone() },
];

#[rustfmt::skip]
static FIELD_ATTRIBUTES: &[Attribute<FieldState>] = &[
    Attribute { flag: FieldSubscription::ACTIVE, name: "active", shallow: false, read: |s| s.active.into() },
    Attribute { flag: FieldSubscription::DATA, name: "data", shallow: true, read: |s| s.data.clone() },
    Attribute { flag: FieldSubscription::DIRTY, name: "dirty", shallow: false, read: |s| s.dirty.into() },
    Attribute { flag: FieldSubscription::DIRTY_SINCE_LAST_SUBMIT, name: "dirtySinceLastSubmit", shallow: false, read: |s| s.dirty_since_last_submit.into() },
    Attribute { flag: FieldSubscription::ERROR, name: "error", shallow: false, read: |s| opt(&s.error) },
    Attribute { flag: FieldSubscription::INITIAL, name: "initial", shallow: false, read: |s| opt(&s.initial) },
    Attribute { flag: FieldSubscription::INVALID, name: "invalid", shallow: false, read: |s| s.invalid.into() },
    Attribute { flag: FieldSubscription::LENGTH, name: "length", shallow: false, read: |s| s.length.map_or(Value::Null, Value::from) },
    Attribute { flag: FieldSubscription::MODIFIED, name: "modified", shallow: false, read: |s| s.modified.into() },
    Attribute { flag: FieldSubscription::MODIFIED_SINCE_LAST_SUBMIT, name: "modifiedSinceLastSubmit", shallow: false, read: |s| s.modified_since_last_submit.into() },
    Attribute { flag: FieldSubscription::PRISTINE, name: "pristine", shallow: false, read: |s| s.pristine.into() },
    Attribute { flag: FieldSubscription::SUBMIT_ERROR, name: "submitError", shallow: false, read: |s| opt(&s.submit_error) },
    Attribute { flag: FieldSubscription::SUBMIT_FAILED, name: "submitFailed", shallow: false, read: |s| s.submit_failed.into() },
    Attribute { flag: FieldSubscription::SUBMIT_SUCCEEDED, name: "submitSucceeded", shallow: false, read: |s| s.submit_succeeded.into() },
    Attribute { flag: FieldSubscription::SUBMITTING, name: "submitting", shallow: false, read: |s| s.submitting.into() },
    Attribute { flag: FieldSubscription::TOUCHED, name: "touched", shallow: false, read: |s| s.touched.into() },
    Attribute { flag: FieldSubscription::VALID, name: "valid", shallow: false, read: |s| s.valid.into() },
    Attribute { flag: FieldSubscription::VALIDATING, name: "validating", shallow: false, read: |s| s.validating.into() },
    Attribute { flag: FieldSubscription::VALUE, name: "value", shallow: false, read: |s| opt(&s.value) },
    Attribute { flag: FieldSubscription::VISITED, name: "visited", shallow: false, read: |s| s.visited.into() },
];

impl Snapshot for FormState {
    type Mask = FormSubscription;

    fn attributes() -> &'static [Attribute<Self>] {
        FORM_ATTRIBUTES
    }
}

impl Snapshot for FieldState {
    type Mask = FieldSubscription;

    fn attributes() -> &'static [Attribute<Self>] {
        FIELD_ATTRIBUTES
    }
}

/// Filter a form snapshot for one form subscriber
pub fn filter_form_state(
    state: &FormState,
    previous: Option<&FormState>,
    subscription: FormSubscription,
    force: bool,
) -> Option<Update<FormSubscription>> {
    filter_state(state, previous, subscription, force)
}

/// Filter a field snapshot for one field subscriber
pub fn filter_field_state(
    state: &FieldState,
    previous: Option<&FieldState>,
    subscription: FieldSubscription,
    force: bool,
) -> Option<Update<FieldSubscription>> {
    filter_state(state, previous, subscription, force)
}

/// What a field subscriber receives
///
/// The field name and its handle are always present, whatever the mask.
#[derive(Debug, Clone)]
pub struct FieldUpdate {
    pub name: String,
    pub handle: FieldHandle,
    pub state: Update<FieldSubscription>,
}

impl<M: bitflags::Flags + Copy + PartialEq> Memo for Update<M> {
    fn same_as(&self, other: &Self) -> bool {
        Update::same_as(self, other)
    }
}

impl Memo for FieldUpdate {
    fn same_as(&self, other: &Self) -> bool {
        self.name == other.name && self.state.same_as(&other.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldline_core::ValueMap;
    use proptest::prelude::*;

    fn field(value: Option<Value>) -> FieldState {
        FieldState {
            name: "email".into(),
            active: false,
            data: Value::empty_map(),
            dirty: false,
            dirty_since_last_submit: false,
            error: None,
            initial: None,
            invalid: false,
            length: None,
            modified: false,
            modified_since_last_submit: false,
            pristine: true,
            submit_error: None,
            submit_failed: false,
            submit_succeeded: false,
            submitting: false,
            touched: false,
            valid: true,
            validating: false,
            value,
            visited: false,
        }
    }

    #[test]
    fn test_no_previous_always_notifies() {
        let state = field(None);
        let update = filter_field_state(&state, None, FieldSubscription::VALUE, false).unwrap();
        assert_eq!(update.get(FieldSubscription::VALUE), Some(&Value::Null));
        assert_eq!(update.get(FieldSubscription::ERROR), None);
    }

    #[test]
    fn test_unwanted_change_is_filtered() {
        let before = field(Some("a".into()));
        let mut after = before.clone();
        after.touched = true;
        assert!(
            filter_field_state(&after, Some(&before), FieldSubscription::VALUE, false).is_none()
        );
        let update =
            filter_field_state(&after, Some(&before), FieldSubscription::TOUCHED, false).unwrap();
        assert!(update.bool(FieldSubscription::TOUCHED));
        assert_eq!(update.changed(), FieldSubscription::TOUCHED);
    }

    #[test]
    fn test_force_delivers_unchanged() {
        let state = field(Some("a".into()));
        let update =
            filter_field_state(&state, Some(&state), FieldSubscription::VALUE, true).unwrap();
        assert!(update.changed().is_empty());
        assert_eq!(update.delivered(), FieldSubscription::VALUE);
    }

    #[test]
    fn test_data_compares_shallowly() {
        let before = field(None);
        let mut after = before.clone();
        after.data = Value::from(ValueMap::new());
        // fresh but shallow-equal map
        assert!(
            filter_field_state(&after, Some(&before), FieldSubscription::DATA, false).is_none()
        );
    }

    #[test]
    fn test_values_compare_by_identity() {
        let before = field(Some(Value::from(vec!["x"])));
        let after = field(Some(Value::from(vec!["x"])));
        let update = filter_field_state(&after, Some(&before), FieldSubscription::VALUE, false);
        assert!(update.is_some());
    }

    #[test]
    fn test_update_same_as() {
        let state = field(Some("a".into()));
        let a = filter_field_state(&state, None, FieldSubscription::all(), true).unwrap();
        let b = filter_field_state(&state, Some(&state), FieldSubscription::all(), true).unwrap();
        assert!(a.same_as(&b));
        assert_eq!(a.by_name("value"), Some(&Value::from("a")));
    }

    proptest! {
        #[test]
        fn test_delivers_exactly_the_subscribed_attributes(bits in any::<u32>(), touched: bool) {
            let mask = FieldSubscription::from_bits_truncate(bits);
            let before = field(Some("a".into()));
            let mut after = before.clone();
            after.touched = touched;

            let update = filter_field_state(&after, Some(&before), mask, true).unwrap();
            prop_assert_eq!(update.delivered(), mask);
            prop_assert!(mask.contains(update.changed()));
            let expected = if touched {
                mask & FieldSubscription::TOUCHED
            } else {
                FieldSubscription::empty()
            };
            prop_assert_eq!(update.changed(), expected);
        }
    }
}

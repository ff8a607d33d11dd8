//! Engine-owned bookkeeping
//!
//! [`FormRecord`] holds the values and error trees plus submission state,
//! [`FieldRecord`] the per-field flags, validators and last published
//! snapshot. [`MutableState`] bundles both with the field subscriber hubs; it
//! is what mutators receive.

use crate::config::{AfterSubmit, BeforeSubmit, FieldConfig};
use crate::filter::same_snapshot;
use crate::notify::SubscriberHub;
use crate::sentinel::{has_any_error, unwrap_array_error};
use crate::state::{FieldState, FieldUpdate, FormState};
use crate::subscription::FieldSubscription;
use crate::validation::FieldValidator;
use fieldline_core::{get_in, Path, Value, ValueMap};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Equality used to decide whether a field is dirty
pub type IsEqual = Rc<dyn Fn(Option<&Value>, Option<&Value>) -> bool>;

/// Subscribers of one field name
pub type FieldHub = SubscriberHub<FieldSubscription, FieldUpdate>;

/// Default field equality: identity for containers, value for scalars
pub fn identity_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.identical(b),
        _ => false,
    }
}

// ============================================================================
// Field record
// ============================================================================

/// Bookkeeping for one registered field
#[derive(Clone)]
pub struct FieldRecord {
    pub name: String,
    pub active: bool,
    pub touched: bool,
    pub visited: bool,
    pub modified: bool,
    pub modified_since_last_submit: bool,
    pub validating: bool,
    pub data: Value,
    pub is_equal: IsEqual,
    /// Validator slots keyed by the registering subscriber's index
    pub validators: IndexMap<usize, FieldValidator>,
    pub validate_fields: Option<Vec<String>>,
    pub before_submit: Option<BeforeSubmit>,
    pub after_submit: Option<AfterSubmit>,
    /// Snapshot last delivered to this field's subscribers
    pub last_field_state: Option<Rc<FieldState>>,
}

impl FieldRecord {
    /// Fresh record for `name`
    pub fn new(name: impl Into<String>, config: Option<&FieldConfig>) -> Self {
        Self {
            name: name.into(),
            active: false,
            touched: false,
            visited: false,
            modified: false,
            modified_since_last_submit: false,
            validating: false,
            data: config
                .and_then(|c| c.data.clone())
                .unwrap_or_else(Value::empty_map),
            is_equal: config
                .and_then(|c| c.is_equal.clone())
                .unwrap_or_else(|| Rc::new(identity_equal)),
            validators: IndexMap::new(),
            validate_fields: config.and_then(|c| c.validate_fields.clone()),
            before_submit: config.and_then(|c| c.before_submit.clone()),
            after_submit: config.and_then(|c| c.after_submit.clone()),
            last_field_state: None,
        }
    }

    /// Clear interaction flags and force the next notification
    pub fn reset_state(&mut self) {
        self.active = false;
        self.last_field_state = None;
        self.modified = false;
        self.touched = false;
        self.validating = false;
        self.visited = false;
    }

    /// Copy of this record under another name, forced to renotify
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_field_state: None,
            ..self.clone()
        }
    }

    /// Whether any validator slot is registered
    pub fn has_validators(&self) -> bool {
        !self.validators.is_empty()
    }
}

impl fmt::Debug for FieldRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRecord")
            .field("name", &self.name)
            .field("active", &self.active)
            .field("touched", &self.touched)
            .field("visited", &self.visited)
            .field("modified", &self.modified)
            .field("modified_since_last_submit", &self.modified_since_last_submit)
            .field("validating", &self.validating)
            .field("data", &self.data)
            .field("validators", &self.validators.len())
            .field("validate_fields", &self.validate_fields)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Form record
// ============================================================================

/// Values, errors and submission bookkeeping for the whole form
#[derive(Debug, Clone)]
pub struct FormRecord {
    pub active: Option<String>,
    pub values: Value,
    pub initial_values: Option<Value>,
    /// Merged validation errors
    pub errors: Value,
    /// Errors from the last settled async record-level validation
    pub async_errors: Value,
    /// Whole-form validation error
    pub error: Option<Value>,
    pub last_submitted_values: Option<Value>,
    pub submit_errors: Option<Value>,
    pub submit_error: Option<Value>,
    pub submitting: bool,
    pub submit_failed: bool,
    pub submit_succeeded: bool,
    pub reset_while_submitting: bool,
    /// In-flight async validation runs
    pub validating: u32,
}

impl Default for FormRecord {
    fn default() -> Self {
        Self {
            active: None,
            values: Value::empty_map(),
            initial_values: None,
            errors: Value::empty_map(),
            async_errors: Value::empty_map(),
            error: None,
            last_submitted_values: None,
            submit_errors: None,
            submit_error: None,
            submitting: false,
            submit_failed: false,
            submit_succeeded: false,
            reset_while_submitting: false,
            validating: 0,
        }
    }
}

// ============================================================================
// Mutable state
// ============================================================================

/// The engine state a mutator may rewrite in one step
#[derive(Debug, Default)]
pub struct MutableState {
    pub form_state: FormRecord,
    pub fields: IndexMap<String, FieldRecord>,
    pub field_subscribers: IndexMap<String, FieldHub>,
    pub last_form_state: Option<Rc<FormState>>,
}

impl MutableState {
    /// Current value of a field
    pub fn value(&self, name: &str) -> Option<&Value> {
        get_in(&self.form_state.values, &Path::parse(name))
    }

    /// Snapshot of one field derived from the current records
    pub fn publish_field_state(&self, name: &str) -> Option<FieldState> {
        self.fields
            .get(name)
            .map(|field| publish_field_state(&self.form_state, field))
    }

    /// Form snapshot derived from the current records
    ///
    /// Bookkeeping maps and the snapshot itself are reused from the last
    /// published form state whenever they are shallow-equal, so unchanged
    /// state keeps its identity.
    pub fn next_form_state(&self) -> Rc<FormState> {
        let form = &self.form_state;
        let last = self.last_form_state.as_deref();
        let empty = Value::empty_map();
        let initial = form.initial_values.as_ref().unwrap_or(&empty);
        let submitted = form.last_submitted_values.as_ref().unwrap_or(&empty);

        let mut dirty_fields = ValueMap::new();
        let mut dirty_since_submit = ValueMap::new();
        let mut modified = ValueMap::new();
        let mut touched = ValueMap::new();
        let mut visited = ValueMap::new();
        let mut any_modified_since_submit = false;
        let mut any_validating = false;

        for (name, field) in &self.fields {
            let path = Path::parse(name);
            let value = get_in(&form.values, &path);
            if !(field.is_equal)(value, get_in(initial, &path)) {
                dirty_fields.insert(name.clone(), true.into());
            }
            if !(field.is_equal)(value, get_in(submitted, &path)) {
                dirty_since_submit.insert(name.clone(), true.into());
            }
            modified.insert(name.clone(), field.modified.into());
            touched.insert(name.clone(), field.touched.into());
            visited.insert(name.clone(), field.visited.into());
            any_modified_since_submit |= field.modified_since_last_submit;
            any_validating |= field.validating;
        }

        let pristine = dirty_fields.is_empty();
        let has_submit_errors = form.submit_error.is_some()
            || form.submit_errors.as_ref().is_some_and(has_any_error);
        let has_validation_errors = form.error.is_some() || has_any_error(&form.errors);
        let valid = !has_validation_errors && !has_submit_errors;
        let submitted_once = form.last_submitted_values.is_some();

        let next = FormState {
            active: form.active.clone(),
            dirty: !pristine,
            dirty_fields: reuse(dirty_fields, last.map(|l| &l.dirty_fields)),
            dirty_fields_since_last_submit: reuse(
                dirty_since_submit.clone(),
                last.map(|l| &l.dirty_fields_since_last_submit),
            ),
            dirty_since_last_submit: submitted_once && !dirty_since_submit.is_empty(),
            error: form.error.clone(),
            errors: form.errors.clone(),
            has_submit_errors,
            has_validation_errors,
            initial_values: form.initial_values.clone(),
            invalid: !valid,
            modified: reuse(modified, last.map(|l| &l.modified)),
            modified_since_last_submit: submitted_once && any_modified_since_submit,
            pristine,
            submit_error: form.submit_error.clone(),
            submit_errors: form.submit_errors.clone(),
            submit_failed: form.submit_failed,
            submit_succeeded: form.submit_succeeded,
            submitting: form.submitting,
            touched: reuse(touched, last.map(|l| &l.touched)),
            valid,
            validating: form.validating > 0 || any_validating,
            values: form.values.clone(),
            visited: reuse(visited, last.map(|l| &l.visited)),
        };

        match &self.last_form_state {
            Some(last) if same_snapshot(last.as_ref(), &next) => Rc::clone(last),
            _ => Rc::new(next),
        }
    }
}

fn reuse(fresh: ValueMap, previous: Option<&Value>) -> Value {
    let fresh = Value::from(fresh);
    match previous {
        Some(previous) if previous.shallow_eq(&fresh) => previous.clone(),
        _ => fresh,
    }
}

/// Derive the published state of one field
pub fn publish_field_state(form: &FormRecord, field: &FieldRecord) -> FieldState {
    let path = Path::parse(&field.name);
    let value = get_in(&form.values, &path).cloned();
    let error = get_in(&form.errors, &path)
        .map(|error| unwrap_array_error(error).unwrap_or(error).clone())
        .filter(|error| !error.is_null());
    let submit_error = form
        .submit_errors
        .as_ref()
        .and_then(|errors| get_in(errors, &path))
        .filter(|error| !error.is_null())
        .cloned();
    let initial = form
        .initial_values
        .as_ref()
        .and_then(|values| get_in(values, &path))
        .cloned();
    let pristine = (field.is_equal)(initial.as_ref(), value.as_ref());
    let dirty_since_last_submit = form
        .last_submitted_values
        .as_ref()
        .is_some_and(|submitted| !(field.is_equal)(get_in(submitted, &path), value.as_ref()));
    let valid = error.is_none() && submit_error.is_none();

    FieldState {
        name: field.name.clone(),
        active: field.active,
        data: field.data.clone(),
        dirty: !pristine,
        dirty_since_last_submit,
        error,
        initial,
        invalid: !valid,
        length: value.as_ref().and_then(Value::as_list).map(<[Value]>::len),
        modified: field.modified,
        modified_since_last_submit: field.modified_since_last_submit,
        pristine,
        submit_error,
        submit_failed: form.submit_failed,
        submit_succeeded: form.submit_succeeded,
        submitting: form.submitting,
        touched: field.touched,
        valid,
        validating: field.validating,
        value,
        visited: field.visited,
    }
}

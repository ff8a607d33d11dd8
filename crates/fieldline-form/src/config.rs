//! Form and field configuration
//!
//! [`FormConfig`] is the builder a form is created from; [`FieldConfig`] is
//! passed to `register_field`. Options can also be changed on a live form
//! through `Form::set_config`, addressed by [`ConfigOption`] name.

use crate::error::{Error, Result};
use crate::form::Form;
use crate::mutator::{Mutator, Mutators};
use crate::record::IsEqual;
use crate::state::{FieldState, FormState};
use crate::submit::{OnSubmit, SubmitCompletion, SubmitResult};
use crate::validation::{FieldValidator, RecordValidator, Validation};
use fieldline_core::Value;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Receives the form state and every field's state on each form notification pass
pub type DebugCallback = Rc<dyn Fn(&FormState, &IndexMap<String, FieldState>)>;

/// Returning `false` blocks submission
pub type BeforeSubmit = Rc<dyn Fn() -> bool>;

/// Runs after a successful submission
pub type AfterSubmit = Rc<dyn Fn()>;

// ============================================================================
// Form configuration
// ============================================================================

/// Builder for a [`Form`]
///
/// # Example
///
/// ```
/// use fieldline_form::{FormConfig, SubmitResult};
///
/// let form = FormConfig::new()
///     .on_submit(|_values, _form, _done| SubmitResult::Done(None))
///     .validate_on_blur(true)
///     .build()
///     .unwrap();
/// assert!(form.get_state().pristine);
///
/// assert!(FormConfig::new().build().is_err());
/// ```
#[derive(Clone, Default)]
pub struct FormConfig {
    pub(crate) debug: Option<DebugCallback>,
    pub(crate) destroy_on_unregister: bool,
    pub(crate) initial_values: Option<Value>,
    pub(crate) keep_dirty_on_reinitialize: bool,
    pub(crate) mutators: Option<Mutators>,
    pub(crate) on_submit: Option<OnSubmit>,
    pub(crate) validate: Option<RecordValidator>,
    pub(crate) validate_on_blur: bool,
}

impl FormConfig {
    /// Start an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(
        mut self,
        debug: impl Fn(&FormState, &IndexMap<String, FieldState>) + 'static,
    ) -> Self {
        self.debug = Some(Rc::new(debug));
        self
    }

    /// Delete a field's value when its last subscriber unregisters
    pub fn destroy_on_unregister(mut self, destroy: bool) -> Self {
        self.destroy_on_unregister = destroy;
        self
    }

    pub fn initial_values(mut self, values: impl Into<Value>) -> Self {
        self.initial_values = Some(values.into());
        self
    }

    /// Keep dirty values when the form is reinitialized
    pub fn keep_dirty_on_reinitialize(mut self, keep: bool) -> Self {
        self.keep_dirty_on_reinitialize = keep;
        self
    }

    /// Register one mutator
    pub fn mutator(
        mut self,
        name: impl Into<String>,
        mutator: impl Fn(&[Value], &mut crate::MutableState, &crate::Tools) -> Result<Option<Value>>
            + 'static,
    ) -> Self {
        let mutator: Mutator = Rc::new(mutator);
        self.mutators
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), mutator);
        self
    }

    /// Register a set of mutators
    pub fn mutators(mut self, mutators: Mutators) -> Self {
        self.mutators
            .get_or_insert_with(IndexMap::new)
            .extend(mutators);
        self
    }

    pub fn on_submit(
        mut self,
        on_submit: impl Fn(&Value, &Form, SubmitCompletion) -> SubmitResult + 'static,
    ) -> Self {
        self.on_submit = Some(Rc::new(on_submit));
        self
    }

    /// Record-level validator run against the whole values tree
    pub fn validate(mut self, validate: impl Fn(&Value) -> Validation + 'static) -> Self {
        self.validate = Some(Rc::new(validate));
        self
    }

    /// Validate on blur instead of on every change
    pub fn validate_on_blur(mut self, on_blur: bool) -> Self {
        self.validate_on_blur = on_blur;
        self
    }

    /// Create the form
    ///
    /// Fails with [`Error::MissingOnSubmit`] when no submit handler was given.
    pub fn build(self) -> Result<Form> {
        Form::new(self)
    }
}

impl fmt::Debug for FormConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormConfig")
            .field("debug", &self.debug.is_some())
            .field("destroy_on_unregister", &self.destroy_on_unregister)
            .field("initial_values", &self.initial_values)
            .field("keep_dirty_on_reinitialize", &self.keep_dirty_on_reinitialize)
            .field(
                "mutators",
                &self.mutators.as_ref().map(|m| m.keys().collect::<Vec<_>>()),
            )
            .field("on_submit", &self.on_submit.is_some())
            .field("validate", &self.validate.is_some())
            .field("validate_on_blur", &self.validate_on_blur)
            .finish()
    }
}

/// Options held by a live form
pub(crate) struct FormOptions {
    pub debug: Option<DebugCallback>,
    pub destroy_on_unregister: bool,
    pub keep_dirty_on_reinitialize: bool,
    pub mutators: Option<Mutators>,
    pub on_submit: OnSubmit,
    pub validate: Option<RecordValidator>,
    pub validate_on_blur: bool,
}

// ============================================================================
// Runtime option updates
// ============================================================================

/// Names accepted by `Form::set_config`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigOption {
    Debug,
    DestroyOnUnregister,
    InitialValues,
    KeepDirtyOnReinitialize,
    Mutators,
    OnSubmit,
    Validate,
    ValidateOnBlur,
}

impl ConfigOption {
    /// Canonical option name
    pub fn name(self) -> &'static str {
        match self {
            ConfigOption::Debug => "debug",
            ConfigOption::DestroyOnUnregister => "destroyOnUnregister",
            ConfigOption::InitialValues => "initialValues",
            ConfigOption::KeepDirtyOnReinitialize => "keepDirtyOnReinitialize",
            ConfigOption::Mutators => "mutators",
            ConfigOption::OnSubmit => "onSubmit",
            ConfigOption::Validate => "validate",
            ConfigOption::ValidateOnBlur => "validateOnBlur",
        }
    }
}

impl fmt::Display for ConfigOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigOption {
    type Err = Error;

    /// Accepts the canonical camel-case names and their snake-case spelling
    fn from_str(s: &str) -> Result<Self> {
        let option = match s {
            "debug" => ConfigOption::Debug,
            "destroyOnUnregister" | "destroy_on_unregister" => ConfigOption::DestroyOnUnregister,
            "initialValues" | "initial_values" => ConfigOption::InitialValues,
            "keepDirtyOnReinitialize" | "keep_dirty_on_reinitialize" => {
                ConfigOption::KeepDirtyOnReinitialize
            }
            "mutators" => ConfigOption::Mutators,
            "onSubmit" | "on_submit" => ConfigOption::OnSubmit,
            "validate" => ConfigOption::Validate,
            "validateOnBlur" | "validate_on_blur" => ConfigOption::ValidateOnBlur,
            other => return Err(Error::UnrecognisedOption(other.to_string())),
        };
        Ok(option)
    }
}

/// A value for `Form::set_config`
#[derive(Clone)]
pub enum ConfigValue {
    Flag(bool),
    Values(Option<Value>),
    Debug(Option<DebugCallback>),
    Mutators(Option<Mutators>),
    OnSubmit(OnSubmit),
    Validate(Option<RecordValidator>),
}

impl ConfigValue {
    pub(crate) fn expect_flag(self, option: ConfigOption) -> Result<bool> {
        match self {
            ConfigValue::Flag(flag) => Ok(flag),
            _ => Err(invalid(option, "a flag")),
        }
    }
}

pub(crate) fn invalid(option: ConfigOption, expected: &'static str) -> Error {
    Error::InvalidConfigValue {
        option: option.name().to_string(),
        expected,
    }
}

impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Flag(flag) => f.debug_tuple("Flag").field(flag).finish(),
            ConfigValue::Values(values) => f.debug_tuple("Values").field(values).finish(),
            ConfigValue::Debug(debug) => f.debug_tuple("Debug").field(&debug.is_some()).finish(),
            ConfigValue::Mutators(mutators) => f
                .debug_tuple("Mutators")
                .field(&mutators.as_ref().map(|m| m.len()))
                .finish(),
            ConfigValue::OnSubmit(_) => f.write_str("OnSubmit(..)"),
            ConfigValue::Validate(validate) => {
                f.debug_tuple("Validate").field(&validate.is_some()).finish()
            }
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(flag: bool) -> Self {
        ConfigValue::Flag(flag)
    }
}

impl From<Value> for ConfigValue {
    fn from(values: Value) -> Self {
        ConfigValue::Values(Some(values))
    }
}

impl From<Mutators> for ConfigValue {
    fn from(mutators: Mutators) -> Self {
        ConfigValue::Mutators(Some(mutators))
    }
}

// ============================================================================
// Field configuration
// ============================================================================

/// Options for `Form::register_field`
#[derive(Clone, Default)]
pub struct FieldConfig {
    pub(crate) after_submit: Option<AfterSubmit>,
    pub(crate) before_submit: Option<BeforeSubmit>,
    pub(crate) data: Option<Value>,
    pub(crate) default_value: Option<Value>,
    pub(crate) initial_value: Option<Value>,
    pub(crate) is_equal: Option<IsEqual>,
    pub(crate) silent: bool,
    pub(crate) validate: Option<FieldValidator>,
    pub(crate) validate_fields: Option<Vec<String>>,
}

impl FieldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn after_submit(mut self, hook: impl Fn() + 'static) -> Self {
        self.after_submit = Some(Rc::new(hook));
        self
    }

    /// Return `false` from `hook` to block submission
    pub fn before_submit(mut self, hook: impl Fn() -> bool + 'static) -> Self {
        self.before_submit = Some(Rc::new(hook));
        self
    }

    /// Metadata map delivered with the field state
    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Value used only when neither a value nor an initial value exists
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn initial_value(mut self, value: impl Into<Value>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    /// Equality used for dirty/pristine; identity by default
    ///
    /// Runs while the form computes its state, with that state borrowed: it
    /// must be a pure comparison and must not call back into the form.
    pub fn is_equal(
        mut self,
        is_equal: impl Fn(Option<&Value>, Option<&Value>) -> bool + 'static,
    ) -> Self {
        self.is_equal = Some(Rc::new(is_equal));
        self
    }

    /// Notify only this field's subscribers, never the form's
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn validate(
        mut self,
        validate: impl Fn(Option<&Value>, &Value, &FieldState) -> Validation + 'static,
    ) -> Self {
        self.validate = Some(Rc::new(validate));
        self
    }

    /// Fields revalidated when this one changes; empty means only itself
    pub fn validate_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validate_fields = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

impl fmt::Debug for FieldConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldConfig")
            .field("data", &self.data)
            .field("default_value", &self.default_value)
            .field("initial_value", &self.initial_value)
            .field("silent", &self.silent)
            .field("validate", &self.validate.is_some())
            .field("validate_fields", &self.validate_fields)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_names() {
        for option in [
            ConfigOption::Debug,
            ConfigOption::DestroyOnUnregister,
            ConfigOption::InitialValues,
            ConfigOption::KeepDirtyOnReinitialize,
            ConfigOption::Mutators,
            ConfigOption::OnSubmit,
            ConfigOption::Validate,
            ConfigOption::ValidateOnBlur,
        ] {
            assert_eq!(option.name().parse::<ConfigOption>().unwrap(), option);
        }
        assert_eq!(
            "validate_on_blur".parse::<ConfigOption>().unwrap(),
            ConfigOption::ValidateOnBlur
        );
    }

    #[test]
    fn test_unrecognised_option() {
        let err = "colour".parse::<ConfigOption>().unwrap_err();
        assert!(matches!(err, Error::UnrecognisedOption(name) if name == "colour"));
    }

    #[test]
    fn test_flag_value() {
        assert!(ConfigValue::from(true).expect_flag(ConfigOption::Debug).unwrap());
        let err = ConfigValue::Values(None)
            .expect_flag(ConfigOption::ValidateOnBlur)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_missing_on_submit() {
        assert!(matches!(FormConfig::new().build(), Err(Error::MissingOnSubmit)));
    }
}

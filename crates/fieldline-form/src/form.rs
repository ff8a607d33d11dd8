//! Form - the reactive form-state engine
//!
//! A [`Form`] owns the values and error trees, the field records and every
//! subscriber. All state lives behind one `RefCell`; user code (subscribers,
//! validators, submit handlers, mutators) is only ever called after that
//! borrow has been released, so callbacks may freely call back into the form.
//!
//! ## Notification order
//!
//! Operations that touch field state notify field subscribers first and form
//! subscribers second. Unregistering notifies the form first. Form
//! notification is single-flight: a notification requested while one is being
//! delivered sets a flag and the running pass loops once more instead of
//! recursing.
//!
//! ## Async work
//!
//! Async validators and submit handlers run on a single-threaded executor
//! owned by the form. Nothing runs until the embedder drives it with
//! [`Form::run_until_stalled`] or [`Form::run_until`].

use crate::config::{invalid, ConfigOption, ConfigValue, FieldConfig, FormConfig, FormOptions};
use crate::error::{Error, Result};
use crate::filter::Update;
use crate::notify::{Delivery, SubscriberHub};
use crate::record::{identity_equal, publish_field_state, FieldRecord, FormRecord, MutableState};
use crate::state::{filter_field_state, filter_form_state, FieldState, FieldUpdate, FormState};
use crate::subscription::{FieldSubscription, FormSubscription};
use fieldline_core::{get_in, set_in, set_in_pruning, Path, Value};
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::{LocalBoxFuture, Shared};
use indexmap::IndexMap;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};

/// Which subscribers an operation notifies when it completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Listeners {
    Form,
    FieldsThenForm,
    FormThenFields,
    /// After registering a field: that field, then the form unless silent
    Registered { name: String, silent: bool },
}

/// Everything the form mutates, guarded by one borrow
pub(crate) struct Engine {
    pub state: MutableState,
    pub subscribers: SubscriberHub<FormSubscription, Update<FormSubscription>>,
    pub options: FormOptions,
    pub validation_paused: bool,
    pub validation_blocked: bool,
    pub prevent_notification_while_paused: bool,
    /// Generation of the most recently started validation run
    pub generation: u64,
    /// Unsettled async validation runs by generation
    pub async_validations: IndexMap<u64, Shared<LocalBoxFuture<'static, ()>>>,
}

impl Engine {
    fn collect_form_deliveries(&mut self) -> Vec<Delivery<Update<FormSubscription>>> {
        let last = self.state.last_form_state.clone();
        let next = self.state.next_form_state();
        if last.as_ref().is_some_and(|last| Rc::ptr_eq(last, &next)) {
            return Vec::new();
        }
        self.state.last_form_state = Some(Rc::clone(&next));
        self.subscribers.notify(false, |subscription, force| {
            filter_form_state(&next, last.as_deref(), subscription, force)
        })
    }
}

pub(crate) struct FormInner {
    engine: RefCell<Engine>,
    in_batch: Cell<u32>,
    notifying: Cell<bool>,
    rerun: Cell<bool>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

/// Weak reference held by handles and spawned tasks
#[derive(Clone)]
pub(crate) struct WeakForm(Weak<FormInner>);

impl WeakForm {
    pub(crate) fn upgrade(&self) -> Option<Form> {
        self.0.upgrade().map(|inner| Form { inner })
    }
}

/// A reactive form
///
/// Cloning is cheap; clones share the same form.
///
/// # Example
///
/// ```
/// use fieldline_core::Value;
/// use fieldline_form::{FieldSubscription, FormConfig, FormSubscription, SubmitResult};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let form = FormConfig::new()
///     .on_submit(|_, _, _| SubmitResult::Done(None))
///     .build()
///     .unwrap();
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// let subscription = form.subscribe(
///     move |update| sink.borrow_mut().push(update.bool(FormSubscription::DIRTY)),
///     FormSubscription::DIRTY,
/// );
/// let field = form
///     .register_field("name", |_| {}, FieldSubscription::VALUE, None)
///     .unwrap();
///
/// form.change("name", Value::from("Ada")).unwrap();
/// assert_eq!(*seen.borrow(), vec![false, true]);
///
/// field.unsubscribe();
/// subscription.unsubscribe();
/// ```
#[derive(Clone)]
pub struct Form {
    inner: Rc<FormInner>,
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.engine.try_borrow() {
            Ok(engine) => f
                .debug_struct("Form")
                .field("values", &engine.state.form_state.values)
                .field("fields", &engine.state.fields.keys().collect::<Vec<_>>())
                .finish_non_exhaustive(),
            Err(_) => f.write_str("Form { .. }"),
        }
    }
}

impl Form {
    /// Create a form from its configuration
    ///
    /// Fails with [`Error::MissingOnSubmit`] when no submit handler was given.
    pub fn new(config: FormConfig) -> Result<Self> {
        let on_submit = config.on_submit.ok_or(Error::MissingOnSubmit)?;

        let mut state = MutableState::default();
        if let Some(initial_values) = config.initial_values {
            state.form_state = FormRecord {
                values: initial_values.clone(),
                initial_values: Some(initial_values),
                ..FormRecord::default()
            };
        }

        let pool = LocalPool::new();
        let spawner = pool.spawner();
        let form = Form {
            inner: Rc::new(FormInner {
                engine: RefCell::new(Engine {
                    state,
                    subscribers: SubscriberHub::new(),
                    options: FormOptions {
                        debug: config.debug,
                        destroy_on_unregister: config.destroy_on_unregister,
                        keep_dirty_on_reinitialize: config.keep_dirty_on_reinitialize,
                        mutators: config.mutators,
                        on_submit,
                        validate: config.validate,
                        validate_on_blur: config.validate_on_blur,
                    },
                    validation_paused: false,
                    validation_blocked: false,
                    prevent_notification_while_paused: false,
                    generation: 0,
                    async_validations: IndexMap::new(),
                }),
                in_batch: Cell::new(0),
                notifying: Cell::new(false),
                rerun: Cell::new(false),
                pool: RefCell::new(pool),
                spawner,
            }),
        };
        debug!("form created");
        form.run_validation(None, Listeners::Form);
        Ok(form)
    }

    pub(crate) fn engine(&self) -> Ref<'_, Engine> {
        self.inner.engine.borrow()
    }

    pub(crate) fn engine_mut(&self) -> RefMut<'_, Engine> {
        self.inner.engine.borrow_mut()
    }

    pub(crate) fn downgrade(&self) -> WeakForm {
        WeakForm(Rc::downgrade(&self.inner))
    }

    pub(crate) fn spawner(&self) -> &LocalSpawner {
        &self.inner.spawner
    }

    // ========================================================================
    // Notification
    // ========================================================================

    pub(crate) fn notify(&self, listeners: &Listeners) {
        match listeners {
            Listeners::Form => self.notify_form_listeners(),
            Listeners::FieldsThenForm => {
                self.notify_field_listeners(None);
                self.notify_form_listeners();
            }
            Listeners::FormThenFields => {
                self.notify_form_listeners();
                self.notify_field_listeners(None);
            }
            Listeners::Registered { name, silent } => {
                self.notify_field_listeners(Some(name));
                if !silent {
                    self.notify_form_listeners();
                }
            }
        }
    }

    /// Publish the form state to form subscribers
    ///
    /// Suppressed inside a batch and while validation is paused with
    /// notifications prevented. The debug callback still sees every pass.
    pub(crate) fn notify_form_listeners(&self) {
        if self.inner.notifying.get() {
            self.inner.rerun.set(true);
            return;
        }
        self.inner.notifying.set(true);
        loop {
            let (debug, deliveries) = {
                let mut engine = self.engine_mut();
                let debug = engine.options.debug.clone().map(|callback| {
                    let state = &engine.state;
                    let fields: IndexMap<String, FieldState> = state
                        .fields
                        .iter()
                        .map(|(name, field)| {
                            (name.clone(), publish_field_state(&state.form_state, field))
                        })
                        .collect();
                    (callback, state.next_form_state(), fields)
                });
                let suppressed = self.inner.in_batch.get() > 0
                    || (engine.validation_paused && engine.prevent_notification_while_paused);
                let deliveries = if suppressed {
                    Vec::new()
                } else {
                    engine.collect_form_deliveries()
                };
                (debug, deliveries)
            };
            if let Some((callback, state, fields)) = debug {
                callback(&state, &fields);
            }
            for delivery in deliveries {
                delivery.deliver();
            }
            if !self.inner.rerun.replace(false) {
                break;
            }
        }
        self.inner.notifying.set(false);
    }

    /// Publish field states, to one field or to all of them
    pub(crate) fn notify_field_listeners(&self, only: Option<&str>) {
        if self.inner.in_batch.get() > 0 {
            return;
        }
        let deliveries = {
            let mut engine = self.engine_mut();
            let MutableState {
                form_state,
                fields,
                field_subscribers,
                ..
            } = &mut engine.state;
            let names: Vec<String> = match only {
                Some(name) => vec![name.to_string()],
                None => fields.keys().cloned().collect(),
            };

            let mut deliveries = Vec::new();
            for name in names {
                let Some(field) = fields.get_mut(&name) else {
                    continue;
                };
                let next = Rc::new(publish_field_state(form_state, field));
                let last = field.last_field_state.replace(Rc::clone(&next));
                let Some(hub) = field_subscribers.get_mut(&name) else {
                    continue;
                };
                let handle = FieldHandle::new(self.downgrade(), &name);
                deliveries.extend(hub.notify(last.is_none(), |subscription, force| {
                    filter_field_state(&next, last.as_deref(), subscription, force).map(|state| {
                        FieldUpdate {
                            name: name.clone(),
                            handle: handle.clone(),
                            state,
                        }
                    })
                }));
            }
            deliveries
        };
        for delivery in deliveries {
            delivery.deliver();
        }
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Subscribe to form state
    ///
    /// The subscriber is called immediately with the current state, then
    /// whenever an attribute in `subscription` changes.
    pub fn subscribe(
        &self,
        subscriber: impl Fn(&Update<FormSubscription>) + 'static,
        subscription: FormSubscription,
    ) -> Unsubscribe {
        let (index, delivery) = {
            let mut engine = self.engine_mut();
            let index = engine.subscribers.add(Rc::new(subscriber), subscription);
            let current = engine.state.next_form_state();
            let delivery = engine.subscribers.notify_one(index, true, |subscription, force| {
                filter_form_state(&current, Some(current.as_ref()), subscription, force)
            });
            (index, delivery)
        };
        if let Some(delivery) = delivery {
            delivery.deliver();
        }

        let form = self.downgrade();
        Unsubscribe::new(move || {
            if let Some(form) = form.upgrade() {
                form.engine_mut().subscribers.remove(index);
            }
        })
    }

    /// Register a subscriber for the field `name`
    ///
    /// The first registration of a name creates its record from `config`.
    /// Every registration may add a validator, which is removed again when that
    /// registration unsubscribes. When the last subscriber of a name leaves,
    /// the field record goes away with it.
    pub fn register_field(
        &self,
        name: &str,
        subscriber: impl Fn(&FieldUpdate) + 'static,
        subscription: FieldSubscription,
        config: Option<FieldConfig>,
    ) -> Result<Unsubscribe> {
        let silent = config.as_ref().is_some_and(|config| config.silent);
        let path = Path::parse(name);

        let (index, has_validator, seeded_initial) = {
            let mut engine = self.engine_mut();
            let state = &mut engine.state;
            let seeded = match &config {
                Some(config) => seed_field_values(&state.form_state, &path, config)?,
                None => Seeded::default(),
            };

            let index = state
                .field_subscribers
                .entry(name.to_string())
                .or_default()
                .add(Rc::new(subscriber), subscription);
            let field = state
                .fields
                .entry(name.to_string())
                .or_insert_with(|| FieldRecord::new(name, config.as_ref()));
            let mut has_validator = false;
            if let Some(validate) = config.as_ref().and_then(|config| config.validate.clone()) {
                field.validators.insert(index, validate);
                has_validator = true;
            }

            if let Some(values) = seeded.values {
                state.form_state.values = values;
            }
            if let Some(initial_values) = seeded.initial_values {
                state.form_state.initial_values = Some(initial_values);
            }
            (index, has_validator, seeded.initial)
        };
        debug!(field = name, index, has_validator, "field registered");

        let listeners = Listeners::Registered {
            name: name.to_string(),
            silent,
        };
        if seeded_initial {
            self.run_validation(None, listeners.clone());
        }
        if has_validator {
            self.run_validation(None, listeners);
        } else {
            self.notify(&listeners);
        }

        let form = self.downgrade();
        let name = name.to_string();
        Ok(Unsubscribe::new(move || {
            if let Some(form) = form.upgrade() {
                form.unregister_field(&name, index, silent);
            }
        }))
    }

    fn unregister_field(&self, name: &str, index: usize, silent: bool) {
        let (validator_removed, last_one) = {
            let mut engine = self.engine_mut();
            let destroy = engine.options.destroy_on_unregister;
            let state = &mut engine.state;
            let validator_removed = state
                .fields
                .get_mut(name)
                .is_some_and(|field| field.validators.shift_remove(&index).is_some());
            let last_one = match state.field_subscribers.get_mut(name) {
                Some(hub) => {
                    hub.remove(index);
                    hub.is_empty()
                }
                None => false,
            };

            if last_one {
                state.field_subscribers.shift_remove(name);
                state.fields.shift_remove(name);
                let path = Path::parse(name);
                let form = &mut state.form_state;
                if validator_removed {
                    match set_in(&form.errors, &path, None) {
                        Ok(errors) => form.errors = errors.unwrap_or_else(Value::empty_map),
                        Err(err) => warn!(field = name, %err, "could not clear field errors"),
                    }
                }
                if destroy {
                    match set_in_pruning(&form.values, &path, None) {
                        Ok(values) => form.values = values.unwrap_or_else(Value::empty_map),
                        Err(err) => warn!(field = name, %err, "could not destroy field value"),
                    }
                }
            }
            (validator_removed, last_one)
        };
        debug!(field = name, index, last_one, "field unregistered");

        if silent {
            return;
        }
        if validator_removed {
            self.run_validation(None, Listeners::FormThenFields);
        } else if last_one {
            self.notify_form_listeners();
        }
    }

    // ========================================================================
    // Field operations
    // ========================================================================

    /// Set the value of `name`; `None` deletes it
    ///
    /// Writing the identical value is a no-op.
    pub fn change(&self, name: &str, value: impl Into<Option<Value>>) -> Result<()> {
        let value = value.into();
        let path = Path::parse(name);
        let validate_on_blur = {
            let mut engine = self.engine_mut();
            let form = &mut engine.state.form_state;
            if identity_equal(get_in(&form.values, &path), value.as_ref()) {
                return Ok(());
            }
            form.values = set_in(&form.values, &path, value)?.unwrap_or_else(Value::empty_map);
            let submitted = form.last_submitted_values.is_some();
            if let Some(field) = engine.state.fields.get_mut(name) {
                field.modified = true;
                field.modified_since_last_submit = submitted;
            }
            engine.options.validate_on_blur
        };
        trace!(field = name, "value changed");

        if validate_on_blur {
            self.notify(&Listeners::FieldsThenForm);
        } else {
            self.run_validation(Some(name), Listeners::FieldsThenForm);
        }
        Ok(())
    }

    /// Mark `name` as no longer focused and touched
    pub fn blur(&self, name: &str) {
        let validate_on_blur = {
            let mut engine = self.engine_mut();
            let Some(field) = engine.state.fields.get_mut(name) else {
                return;
            };
            field.active = false;
            field.touched = true;
            engine.state.form_state.active = None;
            engine.options.validate_on_blur
        };
        if validate_on_blur {
            self.run_validation(Some(name), Listeners::FieldsThenForm);
        } else {
            self.notify(&Listeners::FieldsThenForm);
        }
    }

    /// Mark `name` as focused and visited
    pub fn focus(&self, name: &str) {
        {
            let mut engine = self.engine_mut();
            let Some(field) = engine.state.fields.get_mut(name) else {
                return;
            };
            if field.active {
                return;
            }
            field.active = true;
            field.visited = true;
            engine.state.form_state.active = Some(name.to_string());
        }
        self.notify(&Listeners::FieldsThenForm);
    }

    /// Run `f` with notifications deferred until it returns
    ///
    /// Batches nest; subscribers are notified once, when the outermost batch
    /// ends.
    pub fn batch<T>(&self, f: impl FnOnce() -> T) -> T {
        self.inner.in_batch.set(self.inner.in_batch.get() + 1);
        let result = f();
        self.inner
            .in_batch
            .set(self.inner.in_batch.get().saturating_sub(1));
        self.notify(&Listeners::FieldsThenForm);
        result
    }

    // ========================================================================
    // Whole-form operations
    // ========================================================================

    /// Replace the initial values and the values with `values`
    ///
    /// With `keep_dirty_on_reinitialize`, fields that are dirty keep their
    /// current value.
    pub fn initialize(&self, values: impl Into<Value>) -> Result<()> {
        let values = values.into();
        self.initialize_with(move |_| values)
    }

    /// Like [`initialize`](Self::initialize), computing the values from the current ones
    pub fn initialize_with(&self, init: impl FnOnce(&Value) -> Value) -> Result<()> {
        let current = self.engine().state.form_state.values.clone();
        let values = init(&current);
        {
            let mut engine = self.engine_mut();
            let keep_dirty = engine.options.keep_dirty_on_reinitialize;
            let state = &mut engine.state;
            let mut next = values.clone();
            if keep_dirty {
                let form = &state.form_state;
                let empty = Value::empty_map();
                let initial = form.initial_values.as_ref().unwrap_or(&empty);
                for (name, field) in &state.fields {
                    let path = Path::parse(name);
                    let value = get_in(&form.values, &path);
                    if !(field.is_equal)(value, get_in(initial, &path)) {
                        next = set_in(&next, &path, value.cloned())?
                            .unwrap_or_else(Value::empty_map);
                    }
                }
            }
            state.form_state.initial_values = Some(values);
            state.form_state.values = next;
        }
        debug!("form initialized");
        self.run_validation(None, Listeners::FieldsThenForm);
        Ok(())
    }

    /// Clear submission state and reinitialize
    ///
    /// Uses `initial_values` when given, else the current initial values.
    pub fn reset(&self, initial_values: Option<Value>) -> Result<()> {
        let initial_values = {
            let mut engine = self.engine_mut();
            let form = &mut engine.state.form_state;
            if form.submitting {
                form.reset_while_submitting = true;
            }
            form.submit_failed = false;
            form.submit_succeeded = false;
            form.submit_error = None;
            form.submit_errors = None;
            form.last_submitted_values = None;
            initial_values
                .or_else(|| form.initial_values.clone())
                .unwrap_or_else(Value::empty_map)
        };
        self.initialize(initial_values)
    }

    /// Reset every field's interaction state, then [`reset`](Self::reset)
    pub fn restart(&self, initial_values: Option<Value>) -> Result<()> {
        self.batch(|| {
            {
                let mut engine = self.engine_mut();
                for field in engine.state.fields.values_mut() {
                    field.reset_state();
                    field.modified_since_last_submit = false;
                }
            }
            self.run_validation(None, Listeners::FieldsThenForm);
            self.reset(initial_values)
        })
    }

    /// Clear the interaction flags of `name`
    pub fn reset_field_state(&self, name: &str) {
        if let Some(field) = self.engine_mut().state.fields.get_mut(name) {
            field.reset_state();
        }
        self.run_validation(None, Listeners::FieldsThenForm);
    }

    /// Stop running validation until [`resume_validation`](Self::resume_validation)
    ///
    /// With `prevent_notification`, form subscribers are not notified either.
    pub fn pause_validation(&self, prevent_notification: bool) {
        let mut engine = self.engine_mut();
        engine.validation_paused = true;
        engine.prevent_notification_while_paused = prevent_notification;
    }

    /// Resume validation, running it once if anything asked for it meanwhile
    pub fn resume_validation(&self) {
        let blocked = {
            let mut engine = self.engine_mut();
            engine.validation_paused = false;
            engine.prevent_notification_while_paused = false;
            std::mem::take(&mut engine.validation_blocked)
        };
        if blocked {
            self.run_validation(None, Listeners::FieldsThenForm);
        }
    }

    pub fn is_validation_paused(&self) -> bool {
        self.engine().validation_paused
    }

    /// Change an option on the live form
    ///
    /// `option` takes the names listed by [`ConfigOption`].
    pub fn set_config(&self, option: &str, value: impl Into<ConfigValue>) -> Result<()> {
        let option: ConfigOption = option.parse()?;
        let value = value.into();
        trace!(%option, "updating config");
        match option {
            ConfigOption::Debug => match value {
                ConfigValue::Debug(debug) => self.engine_mut().options.debug = debug,
                _ => return Err(invalid(option, "a debug callback")),
            },
            ConfigOption::DestroyOnUnregister => {
                self.engine_mut().options.destroy_on_unregister = value.expect_flag(option)?
            }
            ConfigOption::InitialValues => match value {
                ConfigValue::Values(values) => {
                    self.initialize(values.unwrap_or_else(Value::empty_map))?
                }
                _ => return Err(invalid(option, "a values tree")),
            },
            ConfigOption::KeepDirtyOnReinitialize => {
                self.engine_mut().options.keep_dirty_on_reinitialize = value.expect_flag(option)?
            }
            ConfigOption::Mutators => match value {
                ConfigValue::Mutators(mutators) => self.engine_mut().options.mutators = mutators,
                _ => return Err(invalid(option, "a mutator map")),
            },
            ConfigOption::OnSubmit => match value {
                ConfigValue::OnSubmit(on_submit) => self.engine_mut().options.on_submit = on_submit,
                _ => return Err(invalid(option, "a submit handler")),
            },
            ConfigOption::Validate => match value {
                ConfigValue::Validate(validate) => {
                    self.engine_mut().options.validate = validate;
                    self.run_validation(None, Listeners::FieldsThenForm);
                }
                _ => return Err(invalid(option, "a record validator")),
            },
            ConfigOption::ValidateOnBlur => {
                self.engine_mut().options.validate_on_blur = value.expect_flag(option)?
            }
        }
        Ok(())
    }

    pub fn destroy_on_unregister(&self) -> bool {
        self.engine().options.destroy_on_unregister
    }

    pub fn set_destroy_on_unregister(&self, destroy: bool) {
        self.engine_mut().options.destroy_on_unregister = destroy;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current form state
    pub fn get_state(&self) -> Rc<FormState> {
        self.engine().state.next_form_state()
    }

    /// State last published to the subscribers of `name`
    pub fn get_field_state(&self, name: &str) -> Option<Rc<FieldState>> {
        self.engine()
            .state
            .fields
            .get(name)
            .and_then(|field| field.last_field_state.clone())
    }

    /// Names of registered fields, in registration order
    pub fn get_registered_fields(&self) -> Vec<String> {
        self.engine().state.fields.keys().cloned().collect()
    }

    /// Handle bound to the field `name`
    pub fn field(&self, name: &str) -> FieldHandle {
        FieldHandle::new(self.downgrade(), name)
    }

    // ========================================================================
    // Executor
    // ========================================================================

    /// Poll pending async work until none of it can make progress
    ///
    /// Returns `false` without doing anything when called from inside the
    /// executor.
    pub fn run_until_stalled(&self) -> bool {
        match self.inner.pool.try_borrow_mut() {
            Ok(mut pool) => {
                pool.run_until_stalled();
                true
            }
            Err(_) => {
                warn!("run_until_stalled called while the form executor is running");
                false
            }
        }
    }

    /// Drive the executor until `future` resolves
    pub fn run_until<F: Future>(&self, future: F) -> Result<F::Output> {
        let mut pool = self
            .inner
            .pool
            .try_borrow_mut()
            .map_err(|_| Error::ExecutorBusy)?;
        Ok(pool.run_until(future))
    }
}

/// Values written by a field registration
#[derive(Debug, Default)]
struct Seeded {
    values: Option<Value>,
    initial_values: Option<Value>,
    /// An initial value was applied
    initial: bool,
}

/// Compute the writes `config` makes on registration, without applying them
fn seed_field_values(form: &FormRecord, path: &Path, config: &FieldConfig) -> Result<Seeded> {
    let current = get_in(&form.values, path);
    let initial = form
        .initial_values
        .as_ref()
        .and_then(|values| get_in(values, path));
    let mut seeded = Seeded::default();

    if let Some(initial_value) = &config.initial_value {
        // only while the value has not diverged from its initial value
        if current.is_none() || identity_equal(current, initial) {
            let base = form.initial_values.clone().unwrap_or_else(Value::empty_map);
            seeded.initial_values = set_in(&base, path, Some(initial_value.clone()))?;
            seeded.values = set_in(&form.values, path, Some(initial_value.clone()))?;
            seeded.initial = true;
        }
    } else if let Some(default_value) = &config.default_value {
        if current.is_none() && initial.is_none() {
            seeded.values = set_in(&form.values, path, Some(default_value.clone()))?;
        }
    }
    Ok(seeded)
}

// ============================================================================
// Handles
// ============================================================================

/// Drops a subscription when [`unsubscribe`](Self::unsubscribe) is called
///
/// Dropping the guard without calling it keeps the subscription alive for the
/// life of the form.
#[must_use = "the subscription stays active until unsubscribe is called"]
pub struct Unsubscribe {
    action: Option<Box<dyn FnOnce()>>,
}

impl Unsubscribe {
    pub(crate) fn new(action: impl FnOnce() + 'static) -> Self {
        Self {
            action: Some(Box::new(action)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("pending", &self.action.is_some())
            .finish()
    }
}

/// Operations bound to one field name
///
/// Handles are derived from the name, so a handle keeps addressing the same
/// name after array mutators move field state around.
#[derive(Clone)]
pub struct FieldHandle {
    form: WeakForm,
    name: Rc<str>,
}

impl FieldHandle {
    pub(crate) fn new(form: WeakForm, name: &str) -> Self {
        Self {
            form,
            name: Rc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Change the field's value; a no-op once the form is gone
    pub fn change(&self, value: impl Into<Option<Value>>) -> Result<()> {
        match self.form.upgrade() {
            Some(form) => form.change(&self.name, value),
            None => Ok(()),
        }
    }

    pub fn blur(&self) {
        if let Some(form) = self.form.upgrade() {
            form.blur(&self.name);
        }
    }

    pub fn focus(&self) {
        if let Some(form) = self.form.upgrade() {
            form.focus(&self.name);
        }
    }
}

impl fmt::Debug for FieldHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldHandle").field(&self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submit::SubmitResult;
    use crate::validation::Validation;

    fn form() -> Form {
        FormConfig::new()
            .on_submit(|_, _, _| SubmitResult::Done(None))
            .build()
            .unwrap()
    }

    fn counter() -> (Rc<Cell<u32>>, impl Fn(&Update<FormSubscription>)) {
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        (count, move |_: &Update<FormSubscription>| {
            sink.set(sink.get() + 1)
        })
    }

    fn value_of(form: &Form, name: &str) -> Option<Value> {
        get_in(&form.get_state().values, &Path::parse(name)).cloned()
    }

    #[test]
    fn test_subscribe_delivers_immediately() {
        let form = form();
        let (count, subscriber) = counter();
        let _sub = form.subscribe(subscriber, FormSubscription::VALUES);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_only_wanted_changes_notify() {
        let form = form();
        let _field = form
            .register_field("name", |_| {}, FieldSubscription::VALUE, None)
            .unwrap();
        let (count, subscriber) = counter();
        let _sub = form.subscribe(subscriber, FormSubscription::ACTIVE);

        form.change("name", Value::from("Ada")).unwrap();
        assert_eq!(count.get(), 1);
        form.focus("name");
        assert_eq!(count.get(), 2);
        form.blur("name");
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_batch_notifies_once() {
        let form = form();
        let (count, subscriber) = counter();
        let _sub = form.subscribe(subscriber, FormSubscription::VALUES);
        form.batch(|| {
            form.change("a", Value::from(1i64)).unwrap();
            form.change("b", Value::from(2i64)).unwrap();
            form.change("c", Value::from(3i64)).unwrap();
        });
        assert_eq!(count.get(), 2);
        assert_eq!(value_of(&form, "c"), Some(Value::Int(3)));
    }

    #[test]
    fn test_nested_batch_notifies_at_outermost_end() {
        let form = form();
        let (count, subscriber) = counter();
        let _sub = form.subscribe(subscriber, FormSubscription::VALUES);
        form.batch(|| {
            form.batch(|| form.change("a", Value::from(1i64)).unwrap());
            form.change("b", Value::from(2i64)).unwrap();
        });
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_identical_change_is_noop() {
        let form = form();
        let (count, subscriber) = counter();
        let _sub = form.subscribe(subscriber, FormSubscription::all());
        form.change("a", Value::from("x")).unwrap();
        let after_first = count.get();
        form.change("a", Value::from("x")).unwrap();
        assert_eq!(count.get(), after_first);
    }

    #[test]
    fn test_change_then_delete() {
        let form = form();
        form.change("user.name", Value::from("Ada")).unwrap();
        assert_eq!(value_of(&form, "user.name"), Some(Value::from("Ada")));
        form.change("user.name", None).unwrap();
        assert_eq!(value_of(&form, "user"), None);
        assert_eq!(form.get_state().values, Value::empty_map());
    }

    #[test]
    fn test_change_rejects_numeric_key_on_map() {
        let form = form();
        form.change("user.name", Value::from("Ada")).unwrap();
        let err = form.change("user[0]", Value::from("x")).unwrap_err();
        assert!(matches!(err, Error::Core(_)));
    }

    #[test]
    fn test_field_subscriber_sees_changes() {
        let form = form();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _field = form
            .register_field(
                "name",
                move |update| {
                    sink.borrow_mut()
                        .push(update.state.get(FieldSubscription::VALUE).cloned())
                },
                FieldSubscription::VALUE,
                None,
            )
            .unwrap();
        form.change("name", Value::from("Ada")).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![Some(Value::Null), Some(Value::from("Ada"))]
        );
    }

    #[test]
    fn test_handle_reenters_form() {
        let form = form();
        let handle = Rc::new(RefCell::new(None::<FieldHandle>));
        let slot = Rc::clone(&handle);
        let _field = form
            .register_field(
                "name",
                move |update| *slot.borrow_mut() = Some(update.handle.clone()),
                FieldSubscription::VALUE,
                None,
            )
            .unwrap();
        let handle = handle.borrow().clone().unwrap();
        assert_eq!(handle.name(), "name");
        handle.change(Value::from("Ada")).unwrap();
        handle.focus();
        assert_eq!(form.get_state().active.as_deref(), Some("name"));
        assert_eq!(value_of(&form, "name"), Some(Value::from("Ada")));
    }

    #[test]
    fn test_subscriber_may_call_back_into_form() {
        let form = form();
        let inner = form.clone();
        let _sub = form.subscribe(
            move |update| {
                if update.get(FormSubscription::VALUES).is_some() {
                    let _ = inner.get_state();
                }
            },
            FormSubscription::VALUES,
        );
        form.change("a", Value::from(1i64)).unwrap();
    }

    #[test]
    fn test_change_during_delivery_is_queued() {
        let form = form();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let depth = Rc::new(Cell::new(0u32));
        let deepest = Rc::new(Cell::new(0u32));
        let inner = form.clone();
        let log = Rc::clone(&seen);
        let (current, max) = (Rc::clone(&depth), Rc::clone(&deepest));
        let _sub = form.subscribe(
            move |update| {
                current.set(current.get() + 1);
                max.set(max.get().max(current.get()));
                let a = update
                    .get(FormSubscription::VALUES)
                    .and_then(|values| get_in(values, &Path::parse("a")))
                    .cloned();
                log.borrow_mut().push(a.clone());
                if a == Some(Value::Int(1)) {
                    inner.change("a", Value::from(2i64)).unwrap();
                }
                current.set(current.get() - 1);
            },
            FormSubscription::VALUES,
        );

        form.change("a", Value::from(1i64)).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![None, Some(Value::Int(1)), Some(Value::Int(2))]
        );
        assert_eq!(deepest.get(), 1);
        assert_eq!(depth.get(), 0);
        assert_eq!(
            get_in(&form.get_state().values, &Path::parse("a")),
            Some(&Value::Int(2))
        );
    }

    #[test]
    fn test_custom_is_equal_drives_pristine() {
        let form = FormConfig::new()
            .initial_values([("name", "ada")].into_iter().collect::<Value>())
            .on_submit(|_, _, _| SubmitResult::Done(None))
            .build()
            .unwrap();
        let ignore_case = FieldConfig::new().is_equal(|a, b| {
            let lower = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_lowercase);
            lower(a) == lower(b)
        });
        let _name = form
            .register_field("name", |_| {}, FieldSubscription::DIRTY, Some(ignore_case))
            .unwrap();

        form.change("name", Value::from("ADA")).unwrap();
        assert!(form.get_state().pristine);
        assert!(!form.get_field_state("name").unwrap().dirty);

        form.change("name", Value::from("grace")).unwrap();
        assert!(form.get_state().dirty);
        assert!(form.get_field_state("name").unwrap().dirty);
    }

    #[test]
    fn test_initial_and_default_values() {
        let form = form();
        let _a = form
            .register_field(
                "a",
                |_| {},
                FieldSubscription::VALUE,
                Some(FieldConfig::new().initial_value("init")),
            )
            .unwrap();
        let _b = form
            .register_field(
                "b",
                |_| {},
                FieldSubscription::VALUE,
                Some(FieldConfig::new().default_value("fallback")),
            )
            .unwrap();
        let state = form.get_state();
        assert_eq!(value_of(&form, "a"), Some(Value::from("init")));
        assert_eq!(value_of(&form, "b"), Some(Value::from("fallback")));
        assert_eq!(
            state
                .initial_values
                .as_ref()
                .and_then(|v| get_in(v, &Path::parse("a"))),
            Some(&Value::from("init"))
        );
        // a default value is not an initial value
        assert!(form.get_field_state("b").unwrap().dirty);
        assert!(form.get_field_state("a").unwrap().pristine);
    }

    #[test]
    fn test_initial_value_does_not_override_edits() {
        let form = form();
        form.change("a", Value::from("edited")).unwrap();
        let _a = form
            .register_field(
                "a",
                |_| {},
                FieldSubscription::VALUE,
                Some(FieldConfig::new().initial_value("init")),
            )
            .unwrap();
        assert_eq!(value_of(&form, "a"), Some(Value::from("edited")));
    }

    #[test]
    fn test_last_unsubscribe_drops_field() {
        let form = FormConfig::new()
            .on_submit(|_, _, _| SubmitResult::Done(None))
            .destroy_on_unregister(true)
            .build()
            .unwrap();
        let first = form
            .register_field("name", |_| {}, FieldSubscription::VALUE, None)
            .unwrap();
        let second = form
            .register_field("name", |_| {}, FieldSubscription::VALUE, None)
            .unwrap();
        form.change("name", Value::from("Ada")).unwrap();

        first.unsubscribe();
        assert_eq!(form.get_registered_fields(), vec!["name".to_string()]);
        second.unsubscribe();
        assert!(form.get_registered_fields().is_empty());
        assert_eq!(value_of(&form, "name"), None);
    }

    #[test]
    fn test_unregister_clears_validator_error() {
        let form = form();
        let config = FieldConfig::new().validate(|_, _, _| Validation::error("Required"));
        let field = form
            .register_field("name", |_| {}, FieldSubscription::ERROR, Some(config))
            .unwrap();
        assert!(form.get_state().invalid);
        field.unsubscribe();
        assert!(form.get_state().valid);
    }

    #[test]
    fn test_silent_registration_skips_form_subscribers() {
        let form = form();
        let (count, subscriber) = counter();
        let _sub = form.subscribe(subscriber, FormSubscription::VISITED);
        let _field = form
            .register_field(
                "quiet",
                |_| {},
                FieldSubscription::VALUE,
                Some(FieldConfig::new().silent(true)),
            )
            .unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_focus_and_blur() {
        let form = form();
        let _field = form
            .register_field("name", |_| {}, FieldSubscription::all(), None)
            .unwrap();
        form.focus("name");
        let field = form.get_field_state("name").unwrap();
        assert!(field.active && field.visited && !field.touched);
        form.blur("name");
        let field = form.get_field_state("name").unwrap();
        assert!(!field.active && field.touched);
        assert_eq!(form.get_state().active, None);
    }

    #[test]
    fn test_initialize_keeps_dirty_values() {
        let form = FormConfig::new()
            .on_submit(|_, _, _| SubmitResult::Done(None))
            .keep_dirty_on_reinitialize(true)
            .initial_values([("a", "one"), ("b", "two")].into_iter().collect::<Value>())
            .build()
            .unwrap();
        let _a = form
            .register_field("a", |_| {}, FieldSubscription::VALUE, None)
            .unwrap();
        let _b = form
            .register_field("b", |_| {}, FieldSubscription::VALUE, None)
            .unwrap();
        form.change("a", Value::from("edited")).unwrap();

        form.initialize([("a", "new a"), ("b", "new b")].into_iter().collect::<Value>())
            .unwrap();
        assert_eq!(value_of(&form, "a"), Some(Value::from("edited")));
        assert_eq!(value_of(&form, "b"), Some(Value::from("new b")));
    }

    #[test]
    fn test_reset_restores_initial_values() {
        let form = FormConfig::new()
            .on_submit(|_, _, _| SubmitResult::Done(None))
            .initial_values([("a", "one")].into_iter().collect::<Value>())
            .build()
            .unwrap();
        let _a = form
            .register_field("a", |_| {}, FieldSubscription::VALUE, None)
            .unwrap();
        form.change("a", Value::from("two")).unwrap();
        assert!(form.get_state().dirty);
        form.reset(None).unwrap();
        assert!(form.get_state().pristine);
        assert_eq!(value_of(&form, "a"), Some(Value::from("one")));
    }

    #[test]
    fn test_restart_clears_interaction_state() {
        let form = form();
        let _a = form
            .register_field("a", |_| {}, FieldSubscription::VALUE, None)
            .unwrap();
        form.focus("a");
        form.change("a", Value::from(1i64)).unwrap();
        form.blur("a");
        form.restart(None).unwrap();
        let field = form.get_field_state("a").unwrap();
        assert!(!field.touched && !field.visited && !field.modified);
        assert_eq!(value_of(&form, "a"), None);
    }

    #[test]
    fn test_paused_with_prevention_holds_notifications() {
        let form = form();
        let (count, subscriber) = counter();
        let _sub = form.subscribe(subscriber, FormSubscription::VALUES);
        form.pause_validation(true);
        form.change("a", Value::from(1i64)).unwrap();
        assert_eq!(count.get(), 1);
        form.resume_validation();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_set_config() {
        let form = form();
        form.set_config("destroyOnUnregister", true).unwrap();
        assert!(form.destroy_on_unregister());
        form.set_config("destroy_on_unregister", false).unwrap();
        assert!(!form.destroy_on_unregister());

        form.set_config("initialValues", [("a", 1i64)].into_iter().collect::<Value>())
            .unwrap();
        assert_eq!(value_of(&form, "a"), Some(Value::Int(1)));

        assert!(matches!(
            form.set_config("colour", true),
            Err(Error::UnrecognisedOption(_))
        ));
        assert!(matches!(
            form.set_config("validateOnBlur", Value::Null),
            Err(Error::InvalidConfigValue { .. })
        ));
    }

    #[test]
    fn test_validate_on_blur() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let form = FormConfig::new()
            .on_submit(|_, _, _| SubmitResult::Done(None))
            .validate_on_blur(true)
            .validate(move |_| {
                counter.set(counter.get() + 1);
                Validation::valid()
            })
            .build()
            .unwrap();
        let _a = form
            .register_field("a", |_| {}, FieldSubscription::VALUE, None)
            .unwrap();
        let before = calls.get();
        form.change("a", Value::from(1i64)).unwrap();
        assert_eq!(calls.get(), before);
        form.blur("a");
        assert_eq!(calls.get(), before + 1);
    }

    #[test]
    fn test_debug_callback_sees_fields() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let form = FormConfig::new()
            .on_submit(|_, _, _| SubmitResult::Done(None))
            .debug(move |_, fields| sink.borrow_mut().push(fields.len()))
            .build()
            .unwrap();
        let _a = form
            .register_field("a", |_| {}, FieldSubscription::VALUE, None)
            .unwrap();
        assert_eq!(seen.borrow().last(), Some(&1));
    }

    #[test]
    fn test_run_until_from_inside_executor_is_refused() {
        let form = form();
        let inner = form.clone();
        let refused = form
            .run_until(async move { inner.run_until(async {}).is_err() })
            .unwrap();
        assert!(refused);
    }
}

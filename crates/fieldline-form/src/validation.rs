//! Validation orchestration
//!
//! A validation run calls the record-level validator and every field
//! validator in the working set. Ready results are merged into the error tree
//! straight away and subscribers are notified. Pending results are joined on
//! the form's executor; when they settle the run merges again, unless a newer
//! run has started in the meantime, in which case the results are dropped.
//!
//! Every run takes the next value of a monotonically increasing generation
//! counter. Settling compares against the counter, not against completion
//! order, so only the latest generation can write errors.

use crate::form::{Form, Listeners};
use crate::record::{publish_field_state, MutableState};
use crate::sentinel::{
    hoist_array_error, split_array_error, unwrap_array_error, ARRAY_ERROR, FORM_ERROR,
};
use crate::state::FieldState;
use fieldline_core::{get_in, set_in, Path, Value, ValueMap};
use futures::future::{join_all, FutureExt, LocalBoxFuture};
use futures::task::LocalSpawnExt;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use tracing::{debug, error, trace, warn};

/// Result of calling a validator
pub enum Validation {
    /// The error (or `None`) is known now
    Ready(Option<Value>),
    /// The error will be known when the future resolves
    Pending(LocalBoxFuture<'static, Option<Value>>),
}

impl Validation {
    /// No error
    pub fn valid() -> Self {
        Validation::Ready(None)
    }

    pub fn error(error: impl Into<Value>) -> Self {
        Validation::Ready(Some(error.into()))
    }

    /// Resolve the error asynchronously
    pub fn pending(future: impl Future<Output = Option<Value>> + 'static) -> Self {
        Validation::Pending(future.boxed_local())
    }
}

impl From<Option<Value>> for Validation {
    fn from(error: Option<Value>) -> Self {
        Validation::Ready(error)
    }
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::Ready(error) => f.debug_tuple("Ready").field(error).finish(),
            Validation::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Field validator: `(value, all values, field state)`
pub type FieldValidator = Rc<dyn Fn(Option<&Value>, &Value, &FieldState) -> Validation>;

/// Record-level validator over the whole values tree
///
/// Returns an error map shaped like the values; [`FORM_ERROR`] holds a
/// whole-form error.
pub type RecordValidator = Rc<dyn Fn(&Value) -> Validation>;

/// What a run needs from the engine, captured under one borrow
struct Plan {
    generation: u64,
    limited: bool,
    validate: Option<RecordValidator>,
    values: Value,
    targets: Vec<Target>,
}

struct Target {
    name: String,
    value: Option<Value>,
    state: FieldState,
    validators: Vec<FieldValidator>,
}

/// Results of one field's validators, in registration order
#[derive(Debug)]
struct FieldRun {
    name: String,
    has_validators: bool,
    slots: Vec<Option<Value>>,
    pending: bool,
}

impl FieldRun {
    /// The first registered validator with an error wins
    fn error(&self) -> Option<&Value> {
        self.slots.iter().flatten().next()
    }
}

/// One validation run, kept alive until its async part settles
#[derive(Debug)]
pub(crate) struct ValidationRun {
    generation: u64,
    limited: bool,
    has_record_validator: bool,
    record_errors: Value,
    fields: Vec<FieldRun>,
}

type SlotResult = (usize, usize, Option<Value>);

fn non_null(error: Option<Value>) -> Option<Value> {
    error.filter(|error| !error.is_null())
}

impl MutableState {
    /// Capture the inputs of a run, or `None` when there is nothing to validate
    fn plan_validation(
        &self,
        field_changed: Option<&str>,
        validate: Option<&RecordValidator>,
        generation: u64,
    ) -> Option<Plan> {
        let any_field_validators = self.fields.values().any(|field| field.has_validators());
        if validate.is_none() && !any_field_validators {
            return None;
        }

        let mut limited = false;
        let mut names: Vec<String> = self.fields.keys().cloned().collect();
        if let Some(changed) = field_changed {
            if let Some(validate_fields) = self
                .fields
                .get(changed)
                .and_then(|field| field.validate_fields.as_ref())
            {
                limited = true;
                names = validate_fields.clone();
                names.push(changed.to_string());
            }
        }

        let targets = names
            .into_iter()
            .filter_map(|name| {
                let field = self.fields.get(&name)?;
                Some(Target {
                    value: self.value(&name).cloned(),
                    state: publish_field_state(&self.form_state, field),
                    validators: field.validators.values().cloned().collect(),
                    name,
                })
            })
            .collect();

        Some(Plan {
            generation,
            limited,
            validate: validate.cloned(),
            values: self.form_state.values.clone(),
            targets,
        })
    }

    /// Merge a run's results into the error tree
    ///
    /// `async_record_errors` is `Some` once the async part of the run has
    /// settled; before that the errors of the previous async pass are kept.
    fn process_errors(&mut self, run: &ValidationRun, async_record_errors: Option<Value>) {
        let form = &self.form_state;
        let mut merged = ValueMap::new();
        if run.limited {
            extend_map(&mut merged, &form.errors);
        }
        extend_map(&mut merged, &run.record_errors);
        extend_map(
            &mut merged,
            async_record_errors.as_ref().unwrap_or(&form.async_errors),
        );
        let mut merged = Value::from(merged);
        let lifted = lift_array_errors(&mut merged, &run.fields);

        let mut resolved: Vec<(Path, Value)> = Vec::new();
        for field in &run.fields {
            if !self.fields.contains_key(&field.name) {
                continue;
            }
            let path = Path::parse(&field.name);
            let record_level = get_in(&run.record_errors, &path).filter(|e| !e.is_null());
            let from_parent = get_in(&merged, &path).filter(|e| !e.is_null());
            let error = field
                .error()
                .filter(|_| field.has_validators)
                .or(record_level.filter(|_| run.has_record_validator))
                .or(if record_level.is_none() && !run.limited {
                    from_parent
                } else {
                    None
                })
                .cloned();

            // list-level errors are hoisted once element errors are in place
            let written = match error.as_ref().and_then(Value::as_map) {
                Some(map) if map.contains_key(ARRAY_ERROR) => split_array_error(map),
                _ => error.clone(),
            };
            match set_in(&merged, &path, written) {
                Ok(next) => merged = next.unwrap_or_else(Value::empty_map),
                Err(err) => warn!(field = %field.name, %err, "could not record validation error"),
            }
            if let Some(error) = error {
                resolved.push((path, error));
            }
        }

        let hoists = resolved
            .iter()
            .filter_map(|(path, error)| unwrap_array_error(error).map(|e| (path, e)))
            .chain(
                lifted
                    .iter()
                    .filter(|(path, _)| resolved.iter().all(|(done, _)| done != path))
                    .map(|(path, error)| (path, error)),
            );
        for (path, list_error) in hoists {
            let hoisted = hoist_array_error(get_in(&merged, path), list_error);
            match set_in(&merged, path, Some(hoisted)) {
                Ok(next) => merged = next.unwrap_or_else(Value::empty_map),
                Err(err) => warn!(field = %path, %err, "could not record array error"),
            }
        }

        let form = &mut self.form_state;
        if !form.errors.shallow_eq(&merged) {
            form.errors = merged;
        }
        if let Some(async_errors) = async_record_errors {
            form.async_errors = async_errors;
        }
        form.error = non_null(
            run.record_errors
                .as_map()
                .and_then(|errors| errors.get(FORM_ERROR))
                .cloned(),
        );
    }
}

/// Turn hoisted array errors above the run's fields back into lists
///
/// Element errors can only be written by index under a list. Returns the
/// list-level errors taken off, to be hoisted again once the run is merged.
fn lift_array_errors(merged: &mut Value, fields: &[FieldRun]) -> Vec<(Path, Value)> {
    let mut lifted: Vec<(Path, Value)> = Vec::new();
    for field in fields {
        let path = Path::parse(&field.name);
        for (len, seg) in path.segments().iter().enumerate().skip(1) {
            if !seg.is_index() {
                continue;
            }
            let prefix = path.prefix(len);
            if lifted.iter().any(|(done, _)| *done == prefix) {
                continue;
            }
            let Some(Value::Map(map)) = get_in(merged, &prefix) else {
                continue;
            };
            let Some(list_error) = map.get(ARRAY_ERROR).cloned() else {
                continue;
            };
            let elements = split_array_error(map);
            match set_in(merged, &prefix, elements) {
                Ok(next) => *merged = next.unwrap_or_else(Value::empty_map),
                Err(err) => {
                    warn!(field = %prefix, %err, "could not lift array error");
                    continue;
                }
            }
            lifted.push((prefix, list_error));
        }
    }
    lifted
}

fn extend_map(target: &mut ValueMap, source: &Value) {
    if let Some(source) = source.as_map() {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
}

impl Form {
    /// Run validation and notify `listeners` as results come in
    ///
    /// `field_changed` narrows the run to that field's `validate_fields` when
    /// it declares them.
    pub(crate) fn run_validation(&self, field_changed: Option<&str>, listeners: Listeners) {
        let plan = {
            let mut engine = self.engine_mut();
            if engine.validation_paused {
                engine.validation_blocked = true;
                None
            } else {
                let validate = engine.options.validate.clone();
                let generation = engine.generation + 1;
                let plan = engine
                    .state
                    .plan_validation(field_changed, validate.as_ref(), generation);
                if plan.is_some() {
                    engine.generation = generation;
                }
                plan
            }
        };
        let Some(plan) = plan else {
            self.notify(&listeners);
            return;
        };
        trace!(generation = plan.generation, limited = plan.limited, "validation started");

        // validators run without the engine borrowed
        let mut record_errors = Value::empty_map();
        let mut pending_record = None;
        if let Some(validate) = &plan.validate {
            match validate(&plan.values) {
                Validation::Ready(errors) => {
                    record_errors = non_null(errors).unwrap_or_else(Value::empty_map)
                }
                Validation::Pending(future) => pending_record = Some(future),
            }
        }

        let mut fields = Vec::with_capacity(plan.targets.len());
        let mut pending_fields: Vec<LocalBoxFuture<'static, SlotResult>> = Vec::new();
        for (index, target) in plan.targets.iter().enumerate() {
            let mut run = FieldRun {
                name: target.name.clone(),
                has_validators: !target.validators.is_empty(),
                slots: Vec::with_capacity(target.validators.len()),
                pending: false,
            };
            for (slot, validator) in target.validators.iter().enumerate() {
                match validator(target.value.as_ref(), &plan.values, &target.state) {
                    Validation::Ready(error) => run.slots.push(non_null(error)),
                    Validation::Pending(future) => {
                        run.slots.push(None);
                        run.pending = true;
                        pending_fields.push(
                            future
                                .map(move |error| (index, slot, error))
                                .boxed_local(),
                        );
                    }
                }
            }
            fields.push(run);
        }

        let run = ValidationRun {
            generation: plan.generation,
            limited: plan.limited,
            has_record_validator: plan.validate.is_some(),
            record_errors,
            fields,
        };
        let has_async = pending_record.is_some() || !pending_fields.is_empty();

        if has_async {
            {
                let mut engine = self.engine_mut();
                engine.state.form_state.validating += 1;
                for field in run.fields.iter().filter(|field| field.pending) {
                    if let Some(record) = engine.state.fields.get_mut(&field.name) {
                        record.validating = true;
                    }
                }
            }
            self.notify(&listeners);
        }

        self.engine_mut().state.process_errors(&run, None);
        self.notify(&listeners);

        if has_async {
            self.spawn_settlement(run, listeners, pending_record, pending_fields);
        }
    }

    fn spawn_settlement(
        &self,
        run: ValidationRun,
        listeners: Listeners,
        pending_record: Option<LocalBoxFuture<'static, Option<Value>>>,
        pending_fields: Vec<LocalBoxFuture<'static, SlotResult>>,
    ) {
        let generation = run.generation;
        let form = self.downgrade();
        let task = async move {
            let record = async move {
                match pending_record {
                    Some(future) => Some(future.await),
                    None => None,
                }
            };
            let (record, slots) = futures::join!(record, join_all(pending_fields));
            match form.upgrade() {
                Some(form) => form.settle_validation(run, &listeners, record, slots),
                None => debug!(generation, "form dropped before validation settled"),
            }
        }
        .boxed_local()
        .shared();

        self.engine_mut()
            .async_validations
            .insert(generation, task.clone());
        if let Err(err) = self.spawner().spawn_local(task) {
            error!(generation, %err, "could not schedule async validation");
        }
    }

    fn settle_validation(
        &self,
        mut run: ValidationRun,
        listeners: &Listeners,
        record: Option<Option<Value>>,
        slots: Vec<SlotResult>,
    ) {
        {
            let mut engine = self.engine_mut();
            engine.async_validations.shift_remove(&run.generation);
            for field in run.fields.iter().filter(|field| field.pending) {
                if let Some(record) = engine.state.fields.get_mut(&field.name) {
                    record.validating = false;
                }
            }
            let form = &mut engine.state.form_state;
            form.validating = form.validating.saturating_sub(1);

            if engine.generation > run.generation {
                debug!(
                    generation = run.generation,
                    latest = engine.generation,
                    "discarding superseded validation results"
                );
            } else {
                for (index, slot, error) in slots {
                    if let Some(field) = run.fields.get_mut(index) {
                        if let Some(target) = field.slots.get_mut(slot) {
                            *target = non_null(error);
                        }
                    }
                }
                let async_errors = record
                    .map(|errors| non_null(errors).unwrap_or_else(Value::empty_map))
                    .unwrap_or_else(Value::empty_map);
                engine.state.process_errors(&run, Some(async_errors));
                trace!(generation = run.generation, "async validation settled");
            }
        }
        self.notify(listeners);

        // field flags may have cleared after the last form pass
        let stale_validating = {
            let engine = self.engine();
            engine.state.form_state.validating == 0
                && engine
                    .state
                    .last_form_state
                    .as_ref()
                    .is_some_and(|state| state.validating)
        };
        if stale_validating {
            self.notify_form_listeners();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldConfig, FormConfig};
    use crate::submit::SubmitResult;
    use crate::subscription::{FieldSubscription, FormSubscription};
    use futures::channel::oneshot;
    use std::cell::RefCell;

    fn form_with(config: FormConfig) -> Form {
        config
            .on_submit(|_, _, _| SubmitResult::Done(None))
            .build()
            .unwrap()
    }

    fn error_of(form: &Form, name: &str) -> Option<Value> {
        get_in(&form.get_state().errors, &Path::parse(name)).cloned()
    }

    /// Validator whose results are released by the test, one call at a time
    fn controlled() -> (Rc<RefCell<Vec<oneshot::Sender<Option<Value>>>>>, FieldConfig) {
        let senders = Rc::new(RefCell::new(Vec::new()));
        let queue = Rc::clone(&senders);
        let config = FieldConfig::new().validate(move |_, _, _| {
            let (tx, rx) = oneshot::channel();
            queue.borrow_mut().push(tx);
            Validation::pending(async move { rx.await.unwrap_or(None) })
        });
        (senders, config)
    }

    #[test]
    fn test_sync_field_error() {
        let form = form_with(FormConfig::new());
        let config = FieldConfig::new().validate(|value, _, _| match value {
            Some(_) => Validation::valid(),
            None => Validation::error("Required"),
        });
        let _name = form
            .register_field("name", |_| {}, FieldSubscription::ERROR, Some(config))
            .unwrap();
        assert_eq!(error_of(&form, "name"), Some(Value::from("Required")));

        form.change("name", Value::from("Ada")).unwrap();
        assert_eq!(error_of(&form, "name"), None);
        assert!(form.get_state().valid);
    }

    #[test]
    fn test_record_level_errors_and_form_error() {
        let form = form_with(FormConfig::new().validate(|values| {
            let mut errors = ValueMap::new();
            if get_in(values, &Path::parse("password")).is_none() {
                errors.insert("password".into(), "Required".into());
                errors.insert(FORM_ERROR.into(), "Incomplete".into());
            }
            Validation::Ready(Some(Value::from(errors)))
        }));
        let _field = form
            .register_field("password", |_| {}, FieldSubscription::ERROR, None)
            .unwrap();
        let state = form.get_state();
        assert_eq!(error_of(&form, "password"), Some(Value::from("Required")));
        assert_eq!(state.error, Some(Value::from("Incomplete")));
        assert!(state.has_validation_errors);
    }

    #[test]
    fn test_field_level_overrides_record_level() {
        let form = form_with(FormConfig::new().validate(|_| {
            Validation::Ready(Some([("name", "from record")].into_iter().collect()))
        }));
        let config = FieldConfig::new().validate(|_, _, _| Validation::error("from field"));
        let _field = form
            .register_field("name", |_| {}, FieldSubscription::ERROR, Some(config))
            .unwrap();
        assert_eq!(error_of(&form, "name"), Some(Value::from("from field")));
    }

    #[test]
    fn test_first_registered_validator_wins() {
        let form = form_with(FormConfig::new());
        let (senders, slow) = controlled();
        let fast = FieldConfig::new().validate(|_, _, _| Validation::error("err"));
        let _a = form
            .register_field("name", |_| {}, FieldSubscription::ERROR, Some(fast))
            .unwrap();
        let _b = form
            .register_field("name", |_| {}, FieldSubscription::ERROR, Some(slow))
            .unwrap();
        assert_eq!(error_of(&form, "name"), Some(Value::from("err")));
        assert!(form.get_state().validating);

        for sender in senders.borrow_mut().drain(..) {
            sender.send(None).unwrap();
        }
        form.run_until_stalled();
        assert_eq!(error_of(&form, "name"), Some(Value::from("err")));
        assert!(!form.get_state().validating);
    }

    #[test]
    fn test_superseded_async_results_are_discarded() {
        let form = form_with(FormConfig::new());
        let (senders, config) = controlled();
        let _field = form
            .register_field("name", |_| {}, FieldSubscription::ERROR, Some(config))
            .unwrap();
        senders.borrow_mut().clear();

        form.change("name", Value::from("first")).unwrap();
        form.change("name", Value::from("second")).unwrap();
        let mut pending: Vec<_> = senders.borrow_mut().drain(..).collect();
        assert_eq!(pending.len(), 2);
        let first = pending.remove(0);
        let second = pending.remove(0);

        second.send(Some("second error".into())).unwrap();
        form.run_until_stalled();
        assert_eq!(error_of(&form, "name"), Some(Value::from("second error")));

        first.send(Some("first error".into())).unwrap();
        form.run_until_stalled();
        assert_eq!(error_of(&form, "name"), Some(Value::from("second error")));
        let state = form.get_state();
        assert!(!state.validating);
        assert_eq!(form.get_field_state("name").map(|s| s.validating), Some(false));
    }

    #[test]
    fn test_validating_notifications() {
        let form = form_with(FormConfig::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = form.subscribe(
            move |update| sink.borrow_mut().push(update.bool(FormSubscription::VALIDATING)),
            FormSubscription::VALIDATING,
        );
        let (senders, config) = controlled();
        let _field = form
            .register_field("name", |_| {}, FieldSubscription::ERROR, Some(config))
            .unwrap();
        for sender in senders.borrow_mut().drain(..) {
            sender.send(None).unwrap();
        }
        form.run_until_stalled();
        assert_eq!(*seen.borrow(), vec![false, true, false]);
    }

    #[test]
    fn test_async_record_errors() {
        let release: Rc<RefCell<Option<oneshot::Sender<Option<Value>>>>> =
            Rc::new(RefCell::new(None));
        let slot = Rc::clone(&release);
        let form = form_with(FormConfig::new().validate(move |_| {
            let (tx, rx) = oneshot::channel();
            *slot.borrow_mut() = Some(tx);
            Validation::pending(async move { rx.await.unwrap_or(None) })
        }));
        let _field = form
            .register_field("user", |_| {}, FieldSubscription::ERROR, None)
            .unwrap();
        assert_eq!(error_of(&form, "user"), None);

        let sender = release.borrow_mut().take().unwrap();
        sender
            .send(Some([("user", "taken")].into_iter().collect()))
            .unwrap();
        form.run_until_stalled();
        assert_eq!(error_of(&form, "user"), Some(Value::from("taken")));
    }

    #[test]
    fn test_limited_validation_keeps_other_errors() {
        let form = form_with(FormConfig::new());
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&calls);
        let other = FieldConfig::new().validate(move |_, _, _| {
            log.borrow_mut().push("other");
            Validation::error("other error")
        });
        let narrow = FieldConfig::new()
            .validate(|_, _, _| Validation::valid())
            .validate_fields(Vec::<String>::new());
        let _other = form
            .register_field("other", |_| {}, FieldSubscription::ERROR, Some(other))
            .unwrap();
        let _narrow = form
            .register_field("narrow", |_| {}, FieldSubscription::ERROR, Some(narrow))
            .unwrap();
        let before = calls.borrow().len();

        form.change("narrow", Value::from("x")).unwrap();
        assert_eq!(calls.borrow().len(), before);
        assert_eq!(error_of(&form, "other"), Some(Value::from("other error")));
    }

    #[test]
    fn test_array_error_is_hoisted() {
        let form = form_with(FormConfig::new().initial_values(
            [("tags", Value::from(vec!["a"]))]
                .into_iter()
                .collect::<Value>(),
        ));
        let list = FieldConfig::new().validate(|value, _, _| {
            match value.and_then(Value::as_list).map(|l| l.len()) {
                Some(n) if n >= 2 => Validation::valid(),
                _ => Validation::Ready(Some(crate::sentinel::array_error("too few"))),
            }
        });
        let element = FieldConfig::new().validate(|_, _, _| Validation::error("bad tag"));
        let _list = form
            .register_field("tags", |_| {}, FieldSubscription::ERROR, Some(list))
            .unwrap();
        let _element = form
            .register_field("tags[0]", |_| {}, FieldSubscription::ERROR, Some(element))
            .unwrap();

        assert_eq!(
            form.get_field_state("tags").and_then(|s| s.error.clone()),
            Some(Value::from("too few"))
        );
        assert_eq!(
            form.get_field_state("tags[0]").and_then(|s| s.error.clone()),
            Some(Value::from("bad tag"))
        );
    }

    #[test]
    fn test_limited_validation_under_array_error() {
        let form = form_with(FormConfig::new().initial_values(
            [("tags", Value::from(vec!["bad"]))]
                .into_iter()
                .collect::<Value>(),
        ));
        let list = FieldConfig::new()
            .validate(|_, _, _| Validation::Ready(Some(crate::sentinel::array_error("too few"))));
        let element = FieldConfig::new()
            .validate(|value, _, _| match value.and_then(Value::as_str) {
                Some("bad") => Validation::error("bad tag"),
                _ => Validation::valid(),
            })
            .validate_fields(Vec::<String>::new());
        let _list = form
            .register_field("tags", |_| {}, FieldSubscription::ERROR, Some(list))
            .unwrap();
        let _element = form
            .register_field("tags[0]", |_| {}, FieldSubscription::ERROR, Some(element))
            .unwrap();
        assert_eq!(error_of(&form, "tags[0]"), Some(Value::from("bad tag")));

        form.change("tags[0]", Value::from("good")).unwrap();
        assert_eq!(
            form.get_field_state("tags[0]").and_then(|s| s.error.clone()),
            None
        );
        assert_eq!(
            form.get_field_state("tags").and_then(|s| s.error.clone()),
            Some(Value::from("too few"))
        );
        let errors = form.get_state().errors.clone();
        let tags = get_in(&errors, &Path::parse("tags")).and_then(Value::as_map).unwrap();
        assert_eq!(tags.get(ARRAY_ERROR), Some(&Value::from("too few")));
        assert!(!tags.contains_key("0"));

        form.change("tags[0]", Value::from("bad")).unwrap();
        assert_eq!(error_of(&form, "tags[0]"), Some(Value::from("bad tag")));
        assert_eq!(
            form.get_field_state("tags").and_then(|s| s.error.clone()),
            Some(Value::from("too few"))
        );
    }

    #[test]
    fn test_paused_validation_replays_once() {
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let form = form_with(FormConfig::new().validate(move |_| {
            *counter.borrow_mut() += 1;
            Validation::valid()
        }));
        let baseline = *count.borrow();
        form.pause_validation(true);
        assert!(form.is_validation_paused());
        form.change("a", Value::from(1i64)).unwrap();
        form.change("b", Value::from(2i64)).unwrap();
        assert_eq!(*count.borrow(), baseline);

        form.resume_validation();
        assert_eq!(*count.borrow(), baseline + 1);
        form.resume_validation();
        assert_eq!(*count.borrow(), baseline + 1);
    }
}

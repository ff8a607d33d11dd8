//! Mutators
//!
//! A mutator is a named function that rewrites [`MutableState`] in one step:
//! values, field records and subscriber hubs together. The form hands the
//! state over for the duration of the call and revalidates afterwards.

use crate::error::{Error, Result};
use crate::form::{Form, Listeners, WeakForm};
use crate::record::MutableState;
use fieldline_core::{get_in, set_in, Path, Value};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// `(arguments, state, tools) -> result`
pub type Mutator = Rc<dyn Fn(&[Value], &mut MutableState, &Tools) -> Result<Option<Value>>>;

/// Mutators by name
pub type Mutators = IndexMap<String, Mutator>;

/// Helpers handed to every mutator
#[derive(Debug, Default, Clone, Copy)]
pub struct Tools;

impl Tools {
    /// Replace the value of `name` with `mutate(current)`
    pub fn change_value(
        &self,
        state: &mut MutableState,
        name: &str,
        mutate: impl FnOnce(Option<&Value>) -> Option<Value>,
    ) -> Result<()> {
        let path = Path::parse(name);
        let form = &mut state.form_state;
        let next = mutate(get_in(&form.values, &path));
        form.values = set_in(&form.values, &path, next)?.unwrap_or_else(Value::empty_map);
        Ok(())
    }

    /// Move a field's record, subscribers and value from `from` to `to`
    ///
    /// Does nothing when `from` is not registered.
    pub fn rename_field(&self, state: &mut MutableState, from: &str, to: &str) -> Result<()> {
        if !state.fields.contains_key(from) {
            return Ok(());
        }
        let from_path = Path::parse(from);
        let values = &state.form_state.values;
        let value = get_in(values, &from_path).cloned();
        let cleared = set_in(values, &from_path, None)?.unwrap_or_else(Value::empty_map);
        let moved = set_in(&cleared, &Path::parse(to), value)?.unwrap_or_else(Value::empty_map);
        state.form_state.values = moved;

        if let Some(field) = state.fields.shift_remove(from) {
            state.fields.insert(to.to_string(), field.renamed(to));
        }
        if let Some(hub) = state.field_subscribers.shift_remove(from) {
            state.field_subscribers.insert(to.to_string(), hub);
        }
        state.last_form_state = None;
        Ok(())
    }

    /// Clear the interaction flags of `name`
    pub fn reset_field_state(&self, state: &mut MutableState, name: &str) {
        if let Some(field) = state.fields.get_mut(name) {
            field.reset_state();
        }
    }

    pub fn get_in<'a>(&self, tree: &'a Value, name: &str) -> Option<&'a Value> {
        get_in(tree, &Path::parse(name))
    }

    pub fn set_in(&self, tree: &Value, name: &str, value: Option<Value>) -> Result<Option<Value>> {
        Ok(set_in(tree, &Path::parse(name), value)?)
    }

    pub fn shallow_eq(&self, a: &Value, b: &Value) -> bool {
        a.shallow_eq(b)
    }
}

impl Form {
    /// Run the mutator registered as `name`
    ///
    /// Validation runs afterwards whether the mutator succeeded or not. With no
    /// mutators configured at all this is a no-op returning `Ok(None)`.
    pub fn mutate(&self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        let (mutator, mut state) = {
            let mut engine = self.engine_mut();
            let Some(mutators) = engine
                .options
                .mutators
                .as_ref()
                .filter(|mutators| !mutators.is_empty())
            else {
                return Ok(None);
            };
            let mutator = mutators
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnknownMutator(name.to_string()))?;
            (mutator, std::mem::take(&mut engine.state))
        };

        debug!(mutator = name, args = args.len(), "running mutator");
        let result = mutator(args, &mut state, &Tools);
        self.engine_mut().state = state;
        if let Err(err) = &result {
            warn!(mutator = name, %err, "mutator failed");
        }

        self.run_validation(None, Listeners::FieldsThenForm);
        result
    }

    /// A callable bound to the mutator `name`
    pub fn bind_mutator(&self, name: &str) -> BoundMutator {
        BoundMutator {
            form: self.downgrade(),
            name: Rc::from(name),
        }
    }

    /// Every configured mutator, bound to this form
    pub fn mutators(&self) -> IndexMap<String, BoundMutator> {
        let names: Vec<String> = self
            .engine()
            .options
            .mutators
            .as_ref()
            .map(|mutators| mutators.keys().cloned().collect())
            .unwrap_or_default();
        names
            .into_iter()
            .map(|name| {
                let bound = self.bind_mutator(&name);
                (name, bound)
            })
            .collect()
    }
}

/// A mutator bound to a form
#[derive(Clone)]
pub struct BoundMutator {
    form: WeakForm,
    name: Rc<str>,
}

impl BoundMutator {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the mutator; `Ok(None)` once the form is gone
    pub fn call(&self, args: &[Value]) -> Result<Option<Value>> {
        match self.form.upgrade() {
            Some(form) => form.mutate(&self.name, args),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for BoundMutator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoundMutator").field(&self.name).finish()
    }
}

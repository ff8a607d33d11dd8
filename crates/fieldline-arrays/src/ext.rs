//! Typed access to the list mutators of a form

use fieldline_core::{get_in, Path, Value};
use fieldline_form::{Form, Result};

/// Adds [`FieldArray`] access to [`Form`]
pub trait FieldArrayExt {
    /// The list field `name`
    ///
    /// The form must have been built with [`crate::mutators`] registered.
    fn field_array(&self, name: &str) -> FieldArray<'_>;
}

impl FieldArrayExt for Form {
    fn field_array(&self, name: &str) -> FieldArray<'_> {
        FieldArray {
            form: self,
            name: name.to_string(),
        }
    }
}

/// One list field of a form
///
/// Every operation goes through [`Form::mutate`], so validation and
/// notification follow as for any other mutator.
///
/// ```
/// use fieldline_arrays::FieldArrayExt;
/// use fieldline_form::{FormConfig, SubmitResult};
///
/// let form = FormConfig::new()
///     .mutators(fieldline_arrays::mutators())
///     .on_submit(|_, _, _| SubmitResult::Done(None))
///     .build()
///     .unwrap();
///
/// let tags = form.field_array("tags");
/// tags.push("rust").unwrap();
/// tags.unshift("forms").unwrap();
/// assert_eq!(tags.len(), 2);
/// assert_eq!(tags.pop().unwrap(), Some("rust".into()));
/// ```
#[derive(Debug, Clone)]
pub struct FieldArray<'f> {
    form: &'f Form,
    name: String,
}

impl FieldArray<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of elements currently stored
    pub fn len(&self) -> usize {
        get_in(&self.form.get_state().values, &Path::parse(&self.name))
            .and_then(Value::as_list)
            .map_or(0, <[Value]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        self.call("insert", vec![index.into(), value.into()])
            .map(|_| ())
    }

    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        self.call("push", vec![value.into()]).map(|_| ())
    }

    pub fn unshift(&self, value: impl Into<Value>) -> Result<()> {
        self.call("unshift", vec![value.into()]).map(|_| ())
    }

    pub fn concat(&self, values: Vec<Value>) -> Result<()> {
        self.call("concat", vec![Value::list(values)]).map(|_| ())
    }

    /// Remove and return the element at `index`
    pub fn remove(&self, index: usize) -> Result<Option<Value>> {
        self.call("remove", vec![index.into()])
    }

    /// Remove several elements at once, returning them in the order given
    pub fn remove_batch(&self, indexes: &[usize]) -> Result<Vec<Value>> {
        let indexes = indexes.iter().map(|&index| Value::from(index)).collect();
        let removed = self.call("removeBatch", vec![Value::list(indexes)])?;
        Ok(removed
            .as_ref()
            .and_then(Value::as_list)
            .map(<[Value]>::to_vec)
            .unwrap_or_default())
    }

    pub fn pop(&self) -> Result<Option<Value>> {
        self.call("pop", Vec::new())
    }

    pub fn shift(&self) -> Result<Option<Value>> {
        self.call("shift", Vec::new())
    }

    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        self.call("move", vec![from.into(), to.into()]).map(|_| ())
    }

    pub fn swap(&self, a: usize, b: usize) -> Result<()> {
        self.call("swap", vec![a.into(), b.into()]).map(|_| ())
    }

    pub fn update(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        self.call("update", vec![index.into(), value.into()])
            .map(|_| ())
    }

    fn call(&self, mutator: &str, rest: Vec<Value>) -> Result<Option<Value>> {
        let mut args = Vec::with_capacity(rest.len() + 1);
        args.push(Value::from(self.name.as_str()));
        args.extend(rest);
        self.form.mutate(mutator, &args)
    }
}

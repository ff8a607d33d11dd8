//! Shrinking a list: remove, remove_batch, pop, shift

use crate::args::Args;
use crate::fields::{current_list, renumber, write_or_clear, IndexedKeys, Renumber};
use fieldline_core::{get_in, set_in, Path, Value};
use fieldline_form::{MutableState, Result, Tools};
use std::cmp::Ordering;

/// `remove(name, index)`, returning the removed element
///
/// Records of the element are dropped and records above it move down. The
/// value is removed entirely once the list is empty.
pub fn remove(args: &[Value], state: &mut MutableState, tools: &Tools) -> Result<Option<Value>> {
    let args = Args::new("remove", args);
    let name = args.name()?;
    let index = args.index(1)?;
    remove_at(state, tools, name, index)
}

/// `pop(name)`
pub fn pop(args: &[Value], state: &mut MutableState, tools: &Tools) -> Result<Option<Value>> {
    let name = Args::new("pop", args).name()?;
    match current_list(state, name)?.len() {
        0 => Ok(None),
        len => remove_at(state, tools, name, len - 1),
    }
}

/// `shift(name)`
pub fn shift(args: &[Value], state: &mut MutableState, tools: &Tools) -> Result<Option<Value>> {
    let name = Args::new("shift", args).name()?;
    remove_at(state, tools, name, 0)
}

/// `removeBatch(name, indexes)`
///
/// Returns the removed elements in the order requested, null where an index
/// was out of range. Duplicate indexes remove once.
pub fn remove_batch(
    args: &[Value],
    state: &mut MutableState,
    tools: &Tools,
) -> Result<Option<Value>> {
    let args = Args::new("removeBatch", args);
    let name = args.name()?;
    let requested = args.indexes(1)?;

    let mut sorted = requested.clone();
    sorted.sort_unstable();
    sorted.dedup();
    let Some(&lowest) = sorted.first() else {
        return Ok(Some(Value::list(Vec::new())));
    };

    let mut list = current_list(state, name)?;
    let removed: Vec<Value> = requested
        .iter()
        .map(|&index| list.get(index).cloned().unwrap_or(Value::Null))
        .collect();
    for &index in sorted.iter().rev() {
        if index < list.len() {
            list.remove(index);
        }
    }
    write_or_clear(tools, state, name, list)?;

    renumber(state, name, |i| match sorted.binary_search(&i) {
        Ok(_) => Renumber::Drop,
        Err(below) if i > lowest => Renumber::To(i - below),
        Err(_) => Renumber::Keep,
    })?;
    Ok(Some(Value::list(removed)))
}

pub(crate) fn remove_at(
    state: &mut MutableState,
    tools: &Tools,
    name: &str,
    index: usize,
) -> Result<Option<Value>> {
    let mut list = current_list(state, name)?;
    let removed = (index < list.len()).then(|| list.remove(index));
    write_or_clear(tools, state, name, list)?;

    let keys = IndexedKeys::new(name)?;
    let registered = state
        .fields
        .keys()
        .any(|key| keys.split(key).is_some_and(|(i, _)| i == index));
    if registered {
        splice_submit_error(state, name, index)?;
    }
    renumber(state, name, |i| match i.cmp(&index) {
        Ordering::Less => Renumber::Keep,
        Ordering::Equal => Renumber::Drop,
        Ordering::Greater => Renumber::To(i - 1),
    })?;
    Ok(removed)
}

/// Drop the element's entry from a list of submit errors under `name`
fn splice_submit_error(state: &mut MutableState, name: &str, index: usize) -> Result<()> {
    let path = Path::parse(name);
    let Some(errors) = state.form_state.submit_errors.as_ref() else {
        return Ok(());
    };
    let Some(Value::List(entries)) = get_in(errors, &path) else {
        return Ok(());
    };
    if index >= entries.len() {
        return Ok(());
    }
    let mut entries = entries.to_vec();
    entries.remove(index);
    let next = set_in(errors, &path, Some(Value::list(entries)))?;
    state.form_state.submit_errors = next;
    Ok(())
}

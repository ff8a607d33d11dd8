//! Growing a list: insert, push, unshift, concat

use crate::args::Args;
use crate::fields::{current_list, renumber, write_list, Renumber};
use fieldline_core::Value;
use fieldline_form::{MutableState, Result, Tools};

/// `insert(name, index, value)`
///
/// The index is clamped to the list length. Records at or above it move up
/// by one.
pub fn insert(args: &[Value], state: &mut MutableState, tools: &Tools) -> Result<Option<Value>> {
    let args = Args::new("insert", args);
    let name = args.name()?;
    let index = args.index(1)?;
    insert_at(state, tools, name, index, args.value(2))?;
    Ok(None)
}

/// `push(name, value)`
pub fn push(args: &[Value], state: &mut MutableState, tools: &Tools) -> Result<Option<Value>> {
    let args = Args::new("push", args);
    let name = args.name()?;
    let len = current_list(state, name)?.len();
    insert_at(state, tools, name, len, args.value(1))?;
    Ok(None)
}

/// `unshift(name, value)`
pub fn unshift(args: &[Value], state: &mut MutableState, tools: &Tools) -> Result<Option<Value>> {
    let args = Args::new("unshift", args);
    let name = args.name()?;
    insert_at(state, tools, name, 0, args.value(1))?;
    Ok(None)
}

/// `concat(name, values)`
pub fn concat(args: &[Value], state: &mut MutableState, tools: &Tools) -> Result<Option<Value>> {
    let args = Args::new("concat", args);
    let name = args.name()?;
    let mut list = current_list(state, name)?;
    list.extend(args.list(1)?);
    write_list(tools, state, name, list)?;
    Ok(None)
}

fn insert_at(
    state: &mut MutableState,
    tools: &Tools,
    name: &str,
    index: usize,
    value: Value,
) -> Result<()> {
    let mut list = current_list(state, name)?;
    let index = index.min(list.len());
    list.insert(index, value);
    write_list(tools, state, name, list)?;
    renumber(state, name, |i| {
        if i >= index {
            Renumber::To(i + 1)
        } else {
            Renumber::Keep
        }
    })?;
    Ok(())
}

//! `update(name, index, value)`

use crate::args::Args;
use crate::fields::{current_list, write_list};
use fieldline_core::Value;
use fieldline_form::{MutableState, Result, Tools};

/// Replace the element at `index`, or append when `index` is past the end
pub fn update(args: &[Value], state: &mut MutableState, tools: &Tools) -> Result<Option<Value>> {
    let args = Args::new("update", args);
    let name = args.name()?;
    let index = args.index(1)?;
    let value = args.value(2);

    let mut list = current_list(state, name)?;
    match list.get_mut(index) {
        Some(slot) => *slot = value,
        None => list.push(value),
    }
    write_list(tools, state, name, list)?;
    Ok(None)
}

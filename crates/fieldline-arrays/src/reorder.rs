//! Reordering a list: move and swap

use crate::args::Args;
use crate::fields::{current_list, renumber, swap_keys, write_list, Renumber};
use fieldline_core::Value;
use fieldline_form::{MutableState, Result, Tools};

/// `move(name, from, to)`
///
/// Records between the two positions shift one step towards `from`.
pub fn move_item(args: &[Value], state: &mut MutableState, tools: &Tools) -> Result<Option<Value>> {
    let args = Args::new("move", args);
    let name = args.name()?;
    let from = args.index(1)?;
    let to = args.index(2)?;
    if from == to {
        return Ok(None);
    }

    let mut list = current_list(state, name)?;
    let item = if from < list.len() {
        list.remove(from)
    } else {
        Value::Null
    };
    let at = to.min(list.len());
    list.insert(at, item);
    write_list(tools, state, name, list)?;

    let (lowest, highest) = (from.min(to), from.max(to));
    renumber(state, name, |i| {
        if i == from {
            Renumber::To(to)
        } else if !(lowest..=highest).contains(&i) {
            Renumber::Keep
        } else if from > to {
            Renumber::To(i + 1)
        } else {
            Renumber::To(i - 1)
        }
    })?;
    Ok(None)
}

/// `swap(name, a, b)`
///
/// The list is padded with nulls when either index is past its end.
pub fn swap(args: &[Value], state: &mut MutableState, tools: &Tools) -> Result<Option<Value>> {
    let args = Args::new("swap", args);
    let name = args.name()?;
    let a = args.index(1)?;
    let b = args.index(2)?;
    if a == b {
        return Ok(None);
    }

    let mut list = current_list(state, name)?;
    let needed = a.max(b) + 1;
    if list.len() < needed {
        list.resize(needed, Value::Null);
    }
    list.swap(a, b);
    write_list(tools, state, name, list)?;
    swap_keys(state, name, a, b);
    Ok(None)
}

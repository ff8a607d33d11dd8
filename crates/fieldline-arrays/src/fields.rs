//! Field-record bookkeeping for list elements
//!
//! Fields registered under a list are keyed `name[index]suffix`. When a
//! mutator moves elements around, the records have to follow their
//! elements, so the field map is rebuilt with rewritten keys. Subscriber
//! hubs stay with their names.

use crate::error::{ArrayError, Result};
use fieldline_core::Value;
use fieldline_form::{FieldRecord, MutableState, Tools};
use indexmap::IndexMap;
use regex::Regex;
use tracing::trace;

/// What happens to the records of one element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Renumber {
    Keep,
    Drop,
    To(usize),
}

/// What happens to one record key
enum Target {
    Keep,
    Drop,
    Rename(String),
}

/// Matches `name[index]suffix` keys for one list
pub(crate) struct IndexedKeys<'n> {
    name: &'n str,
    pattern: Regex,
}

impl<'n> IndexedKeys<'n> {
    pub fn new(name: &'n str) -> Result<Self> {
        let pattern = Regex::new(&format!(r"^{}\[(\d+)\](.*)", regex::escape(name)))?;
        Ok(Self { name, pattern })
    }

    /// Element index and remaining suffix of `key`
    pub fn split<'k>(&self, key: &'k str) -> Option<(usize, &'k str)> {
        let captures = self.pattern.captures(key)?;
        let index = captures.get(1)?.as_str().parse().ok()?;
        let suffix = captures.get(2).map_or("", |m| m.as_str());
        Some((index, suffix))
    }

    pub fn key(&self, index: usize, suffix: &str) -> String {
        format!("{}[{}]{}", self.name, index, suffix)
    }
}

/// Rewrite the records under `name` by element index
pub(crate) fn renumber(
    state: &mut MutableState,
    name: &str,
    policy: impl Fn(usize) -> Renumber,
) -> Result<()> {
    let keys = IndexedKeys::new(name)?;
    rebuild(state, |key| match keys.split(key) {
        Some((index, suffix)) => match policy(index) {
            Renumber::Keep => Target::Keep,
            Renumber::Drop => Target::Drop,
            Renumber::To(to) if to == index => Target::Keep,
            Renumber::To(to) => Target::Rename(keys.key(to, suffix)),
        },
        None => Target::Keep,
    });
    Ok(())
}

/// Exchange the records of elements `a` and `b`
///
/// Keys are matched by prefix; the prefix must end the key or be followed
/// by `.` or `[`, so `items[1]` never captures `items[10]`.
pub(crate) fn swap_keys(state: &mut MutableState, name: &str, a: usize, b: usize) {
    let a_prefix = format!("{name}[{a}]");
    let b_prefix = format!("{name}[{b}]");
    rebuild(state, |key| {
        if let Some(suffix) = strip_element(key, &a_prefix) {
            Target::Rename(format!("{b_prefix}{suffix}"))
        } else if let Some(suffix) = strip_element(key, &b_prefix) {
            Target::Rename(format!("{a_prefix}{suffix}"))
        } else {
            Target::Keep
        }
    });
}

fn strip_element<'k>(key: &'k str, prefix: &str) -> Option<&'k str> {
    key.strip_prefix(prefix)
        .filter(|suffix| suffix.is_empty() || suffix.starts_with(['.', '[']))
}

/// Renamed records overwrite whatever sits at their new key; kept records
/// never displace a renamed one.
fn rebuild(state: &mut MutableState, mut target: impl FnMut(&str) -> Target) {
    let fields = std::mem::take(&mut state.fields);
    let before = fields.len();
    let mut next: IndexMap<String, FieldRecord> = IndexMap::with_capacity(before);
    let mut renamed = 0usize;
    for (key, field) in fields {
        match target(&key) {
            Target::Keep => {
                next.entry(key).or_insert(field);
            }
            Target::Drop => {}
            Target::Rename(to) => {
                renamed += 1;
                let field = field.renamed(to.as_str());
                next.insert(to, field);
            }
        }
    }
    trace!(before, after = next.len(), renamed, "rebuilt field records");
    state.fields = next;
}

/// The list stored at `name`; absent or null reads as empty
pub(crate) fn current_list(state: &MutableState, name: &str) -> Result<Vec<Value>> {
    match state.value(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::List(list)) => Ok(list.to_vec()),
        Some(other) => Err(ArrayError::NotAList {
            name: name.to_string(),
            found: other.type_name(),
        }),
    }
}

/// Store `list` at `name`, even when empty
pub(crate) fn write_list(
    tools: &Tools,
    state: &mut MutableState,
    name: &str,
    list: Vec<Value>,
) -> fieldline_form::Result<()> {
    tools.change_value(state, name, |_| Some(Value::list(list)))
}

/// Store `list` at `name`, removing the value once the list is empty
pub(crate) fn write_or_clear(
    tools: &Tools,
    state: &mut MutableState,
    name: &str,
    list: Vec<Value>,
) -> fieldline_form::Result<()> {
    tools.change_value(state, name, |_| (!list.is_empty()).then(|| Value::list(list)))
}

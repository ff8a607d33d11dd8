//! Persistent get/set over value trees
//!
//! `set_in` never mutates its input. It rebuilds only the containers on the
//! edited path and hands back a tree whose other branches are the same `Rc`
//! allocations as before. Writing `None` deletes: the key is removed, a map
//! emptied by the removal disappears from its own parent, and so on upwards.
//! A map sitting directly inside a list is kept as an empty placeholder so the
//! list does not shift, unless pruning is requested, in which case the list
//! element itself is spliced out.

use crate::{Error, Path, Result, Seg, Value, ValueMap};
use std::rc::Rc;

/// Read the value at `path`
///
/// Returns `None` as soon as the walk meets a scalar, a missing key or an
/// out-of-range index. A key segment on a list yields `None`; an index segment
/// on a map reads the decimal key.
pub fn get_in<'a>(tree: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = tree;
    for seg in path.segments() {
        current = match (current, seg) {
            (Value::Map(map), Seg::Key(key)) => map.get(key.as_str())?,
            (Value::Map(map), Seg::Index(index)) => map.get(index.to_string().as_str())?,
            (Value::List(list), Seg::Index(index)) => list.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at `path`, returning the new tree
///
/// `None` as the result means the whole tree was deleted.
pub fn set_in(tree: &Value, path: &Path, value: Option<Value>) -> Result<Option<Value>> {
    set_recursive(Some(tree), 0, path, value, false)
}

/// Like [`set_in`], but deleting a list element splices it out of the list
pub fn set_in_pruning(tree: &Value, path: &Path, value: Option<Value>) -> Result<Option<Value>> {
    set_recursive(Some(tree), 0, path, value, true)
}

/// Container view of a node; null and scalars are treated as absent
enum Node<'a> {
    Absent,
    Map(&'a Rc<ValueMap>),
    List(&'a Rc<Vec<Value>>),
}

impl<'a> Node<'a> {
    fn of(value: Option<&'a Value>) -> Self {
        match value {
            Some(Value::Map(map)) => Node::Map(map),
            Some(Value::List(list)) => Node::List(list),
            _ => Node::Absent,
        }
    }
}

fn set_recursive(
    current: Option<&Value>,
    depth: usize,
    path: &Path,
    value: Option<Value>,
    prune: bool,
) -> Result<Option<Value>> {
    let segments = path.segments();
    if depth >= segments.len() {
        return Ok(value);
    }

    match &segments[depth] {
        Seg::Key(key) => match Node::of(current) {
            Node::Absent => {
                let result = set_recursive(None, depth + 1, path, value, prune)?;
                Ok(result.map(|inner| {
                    let mut map = ValueMap::new();
                    map.insert(key.clone(), inner);
                    Value::from(map)
                }))
            }
            Node::List(_) => Err(Error::KeyOnList {
                path: path.prefix(depth + 1),
            }),
            Node::Map(map) => {
                let existing = map.get(key.as_str());
                let result = set_recursive(existing, depth + 1, path, value, prune)?;
                match result {
                    None => {
                        if existing.is_none() {
                            // nothing to delete
                            return Ok(if map.is_empty() {
                                None
                            } else {
                                Some(Value::Map(Rc::clone(map)))
                            });
                        }
                        if map.len() <= 1 {
                            // the key being deleted was the only one
                            let inside_list = depth > 0 && segments[depth - 1].is_index();
                            return Ok(if inside_list && !prune {
                                Some(Value::empty_map())
                            } else {
                                None
                            });
                        }
                        let mut next = (**map).clone();
                        next.shift_remove(key.as_str());
                        Ok(Some(Value::from(next)))
                    }
                    Some(inner) => {
                        let mut next = (**map).clone();
                        next.insert(key.clone(), inner);
                        Ok(Some(Value::from(next)))
                    }
                }
            }
        },
        Seg::Index(index) => {
            let index = *index;
            match Node::of(current) {
                Node::Absent => {
                    let result = set_recursive(None, depth + 1, path, value, prune)?;
                    Ok(result.map(|inner| {
                        let mut list = vec![Value::Null; index];
                        list.push(inner);
                        Value::list(list)
                    }))
                }
                Node::Map(_) => Err(Error::NumericKeyOnMap {
                    path: path.prefix(depth + 1),
                }),
                Node::List(list) => {
                    let result = set_recursive(list.get(index), depth + 1, path, value, prune)?;
                    let mut next = (**list).clone();
                    match result {
                        None if prune => {
                            if index < next.len() {
                                next.remove(index);
                            }
                            if next.is_empty() {
                                return Ok(None);
                            }
                        }
                        result => {
                            if index >= next.len() {
                                next.resize(index + 1, Value::Null);
                            }
                            next[index] = result.unwrap_or(Value::Null);
                        }
                    }
                    Ok(Some(Value::list(next)))
                }
            }
        }
    }
}

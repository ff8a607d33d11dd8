//! Reserved error keys
//!
//! Error trees mirror the values tree, with two exceptions. A record-level or
//! submit error stored under [`FORM_ERROR`] belongs to the whole form. An error
//! stored under [`ARRAY_ERROR`] belongs to a list field itself rather than to
//! any of its elements; such an error is kept as a map at the list's path,
//! holding the sentinel plus one decimal key per element error.

use fieldline_core::{Value, ValueMap};

/// Key of an error that is not tied to any field
pub const FORM_ERROR: &str = "FINAL_FORM/form-error";

/// Key of an error attached to a list field as a whole
pub const ARRAY_ERROR: &str = "FINAL_FORM/array-error";

/// Build an error value for a list field as a whole
pub fn array_error(error: impl Into<Value>) -> Value {
    let mut map = ValueMap::new();
    map.insert(ARRAY_ERROR.to_string(), error.into());
    Value::from(map)
}

/// Build a record-level error map carrying a whole-form error
pub fn form_error(error: impl Into<Value>) -> Value {
    let mut map = ValueMap::new();
    map.insert(FORM_ERROR.to_string(), error.into());
    Value::from(map)
}

/// The list-level error carried by `error`, if it is an array error
pub fn unwrap_array_error(error: &Value) -> Option<&Value> {
    error.as_map().and_then(|map| map.get(ARRAY_ERROR))
}

/// Whether an error tree holds at least one error leaf
///
/// Containers are walked; `Null` leaves are holes, not errors.
pub fn has_any_error(errors: &Value) -> bool {
    match errors {
        Value::Null => false,
        Value::Map(map) => map.values().any(has_any_error),
        Value::List(list) => list.iter().any(has_any_error),
        _ => true,
    }
}

/// Split an array error into the list-level error and the element errors
///
/// Element errors are rebuilt as a list so children can still be written by
/// index; `None` when there are no element errors.
pub(crate) fn split_array_error(map: &ValueMap) -> Option<Value> {
    let mut elements: Vec<Value> = Vec::new();
    for (key, child) in map {
        if let Ok(index) = key.parse::<usize>() {
            if elements.len() <= index {
                elements.resize(index + 1, Value::Null);
            }
            elements[index] = child.clone();
        }
    }
    (!elements.is_empty()).then(|| Value::list(elements))
}

/// Hoist a list-level error over whatever element errors sit at its path
pub(crate) fn hoist_array_error(existing: Option<&Value>, error: &Value) -> Value {
    let mut map = ValueMap::new();
    map.insert(ARRAY_ERROR.to_string(), error.clone());
    match existing {
        Some(Value::List(list)) => {
            for (index, child) in list.iter().enumerate() {
                if !child.is_null() {
                    map.insert(index.to_string(), child.clone());
                }
            }
        }
        Some(Value::Map(children)) => {
            for (key, child) in children.iter() {
                if key != ARRAY_ERROR {
                    map.insert(key.clone(), child.clone());
                }
            }
        }
        _ => {}
    }
    Value::from(map)
}

//! Fieldline Arrays - list mutators for fieldline forms
//!
//! Fields that live inside a list are registered as `name[index]...`. The
//! mutators here edit the list value and move those field records along
//! with their elements, so a field's touched/visited flags and validators
//! stay attached to the element rather than to the position.
//!
//! Register them with [`fieldline_form::FormConfig::mutators`] and call them
//! through [`Form::mutate`](fieldline_form::Form::mutate) or the typed
//! [`FieldArray`] facade:
//!
//! | name          | arguments              | returns              |
//! |---------------|------------------------|----------------------|
//! | `insert`      | name, index, value     |                      |
//! | `push`        | name, value            |                      |
//! | `unshift`     | name, value            |                      |
//! | `concat`      | name, list             |                      |
//! | `remove`      | name, index            | removed element      |
//! | `removeBatch` | name, list of indexes  | removed elements     |
//! | `pop`         | name                   | removed element      |
//! | `shift`       | name                   | removed element      |
//! | `move`        | name, from, to         |                      |
//! | `swap`        | name, a, b             |                      |
//! | `update`      | name, index, value     |                      |

mod args;
mod error;
mod ext;
mod fields;
mod insert;
mod remove;
mod reorder;
mod update;

pub use error::{ArrayError, Result};
pub use ext::{FieldArray, FieldArrayExt};
pub use insert::{concat, insert, push, unshift};
pub use remove::{pop, remove, remove_batch, shift};
pub use reorder::{move_item, swap};
pub use update::update;

use fieldline_form::{Mutator, Mutators};
use std::rc::Rc;

/// Every list mutator, keyed by the name it is invoked under
pub fn mutators() -> Mutators {
    let entries: [(&str, Mutator); 11] = [
        ("insert", Rc::new(insert)),
        ("concat", Rc::new(concat)),
        ("move", Rc::new(move_item)),
        ("pop", Rc::new(pop)),
        ("push", Rc::new(push)),
        ("remove", Rc::new(remove)),
        ("removeBatch", Rc::new(remove_batch)),
        ("shift", Rc::new(shift)),
        ("swap", Rc::new(swap)),
        ("unshift", Rc::new(unshift)),
        ("update", Rc::new(update)),
    ];
    entries
        .into_iter()
        .map(|(name, mutator)| (name.to_string(), mutator))
        .collect()
}

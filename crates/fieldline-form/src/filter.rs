//! Subscription filtering
//!
//! A subscriber names the attributes it wants with a bit mask. Filtering a
//! snapshot against the previously published one keeps only those attributes
//! and reports whether any of them changed. Most attributes compare by
//! identity (pointer identity for containers, value for scalars); a few
//! bookkeeping maps compare shallowly since they are rebuilt on every pass.

use bitflags::Flags;
use fieldline_core::Value;

/// One subscribable attribute of a snapshot type
pub struct Attribute<S: Snapshot> {
    /// Mask bit selecting this attribute
    pub flag: S::Mask,
    /// Attribute name as exposed to subscribers
    pub name: &'static str,
    /// Compare with [`Value::shallow_eq`] instead of identity
    pub shallow: bool,
    /// Read the attribute out of a snapshot
    pub read: fn(&S) -> Value,
}

/// A published state whose attributes can be filtered by mask
pub trait Snapshot: Sized + 'static {
    /// Bit mask type naming the attributes
    type Mask: Flags + Copy + PartialEq + std::fmt::Debug + 'static;

    /// The fixed attribute universe, in delivery order
    fn attributes() -> &'static [Attribute<Self>];
}

/// The filtered view of a snapshot handed to a subscriber
#[derive(Debug, Clone)]
pub struct Update<M> {
    attributes: Vec<(M, &'static str, Value)>,
    changed: M,
}

impl<M: Flags + Copy + PartialEq> Update<M> {
    /// Value of a delivered attribute
    pub fn get(&self, flag: M) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|(f, _, _)| *f == flag)
            .map(|(_, _, value)| value)
    }

    /// Value of a delivered attribute, looked up by name
    pub fn by_name(&self, name: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|(_, n, _)| *n == name)
            .map(|(_, _, value)| value)
    }

    /// A delivered boolean attribute; `false` when absent
    pub fn bool(&self, flag: M) -> bool {
        self.get(flag).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Every delivered attribute, in delivery order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.attributes.iter().map(|(_, name, value)| (*name, value))
    }

    /// Mask of the attributes carried by this update
    pub fn delivered(&self) -> M {
        self.attributes
            .iter()
            .fold(M::empty(), |mask, (flag, _, _)| mask.union(*flag))
    }

    /// Mask of the delivered attributes that differ from the previous snapshot
    pub fn changed(&self) -> M {
        self.changed
    }

    /// Whether two updates carry identical attributes
    pub fn same_as(&self, other: &Self) -> bool {
        self.attributes.len() == other.attributes.len()
            && self
                .attributes
                .iter()
                .zip(other.attributes.iter())
                .all(|((fa, _, a), (fb, _, b))| fa == fb && a.identical(b))
    }
}

/// Filter `state` down to `subscription`
///
/// Returns `None` when nothing wanted changed since `previous`, unless there is
/// no previous snapshot or `force` is set.
pub fn filter_state<S: Snapshot>(
    state: &S,
    previous: Option<&S>,
    subscription: S::Mask,
    force: bool,
) -> Option<Update<S::Mask>> {
    let mut attributes = Vec::new();
    let mut changed = S::Mask::empty();
    for attribute in S::attributes() {
        if !subscription.contains(attribute.flag) {
            continue;
        }
        let value = (attribute.read)(state);
        let differs = previous.map_or(true, |previous| {
            let before = (attribute.read)(previous);
            if attribute.shallow {
                !value.shallow_eq(&before)
            } else {
                !value.identical(&before)
            }
        });
        if differs {
            changed.insert(attribute.flag);
        }
        attributes.push((attribute.flag, attribute.name, value));
    }

    (force || previous.is_none() || !changed.is_empty()).then_some(Update {
        attributes,
        changed,
    })
}

/// Whether every attribute of two snapshots is identical
pub(crate) fn same_snapshot<S: Snapshot>(a: &S, b: &S) -> bool {
    S::attributes()
        .iter()
        .all(|attribute| (attribute.read)(a).identical(&(attribute.read)(b)))
}

//! Subscriber registries
//!
//! A hub holds the subscribers of one scope: the whole form, or one field
//! name. Notifying never calls a subscriber directly. It returns the pending
//! [`Delivery`] values so the caller can release its borrow of the engine
//! before user code runs.

use indexmap::IndexMap;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Memoisation key for deliveries
pub trait Memo {
    /// Whether `other` carries exactly what `self` carries
    fn same_as(&self, other: &Self) -> bool;
}

/// A notification waiting to be handed to its subscriber
pub struct Delivery<P> {
    callback: Rc<dyn Fn(&P)>,
    payload: P,
    alive: Rc<Cell<bool>>,
}

impl<P> Delivery<P> {
    /// Invoke the subscriber, unless it unsubscribed in the meantime
    pub(crate) fn deliver(self) {
        if self.alive.get() {
            (self.callback)(&self.payload);
        }
    }
}

struct Entry<M, P> {
    callback: Rc<dyn Fn(&P)>,
    subscription: M,
    notified: bool,
    last: Option<P>,
    alive: Rc<Cell<bool>>,
}

/// Registry of subscribers for one scope
///
/// Entries are keyed by an ever-increasing index so removing one never shifts
/// the others.
pub struct SubscriberHub<M, P> {
    next_index: usize,
    entries: IndexMap<usize, Entry<M, P>>,
}

impl<M, P> Default for SubscriberHub<M, P> {
    fn default() -> Self {
        Self {
            next_index: 0,
            entries: IndexMap::new(),
        }
    }
}

impl<M, P> fmt::Debug for SubscriberHub<M, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHub")
            .field("next_index", &self.next_index)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<M: Copy, P: Clone + Memo> SubscriberHub<M, P> {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber and return its index
    pub fn add(&mut self, callback: Rc<dyn Fn(&P)>, subscription: M) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.entries.insert(
            index,
            Entry {
                callback,
                subscription,
                notified: false,
                last: None,
                alive: Rc::new(Cell::new(true)),
            },
        );
        index
    }

    /// Drop a subscriber; pending deliveries to it are cancelled
    pub fn remove(&mut self, index: usize) -> bool {
        match self.entries.shift_remove(&index) {
            Some(entry) => {
                entry.alive.set(false);
                true
            }
            None => false,
        }
    }

    /// Whether `index` is still subscribed
    pub fn contains(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    /// Number of live subscribers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the hub has no subscribers
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collect deliveries for every subscriber
    ///
    /// `filter` receives the subscriber's mask and whether delivery is forced
    /// (requested by the caller, or the subscriber was never notified). A
    /// payload identical to the one a subscriber last received is dropped.
    pub(crate) fn notify(
        &mut self,
        force: bool,
        mut filter: impl FnMut(M, bool) -> Option<P>,
    ) -> Vec<Delivery<P>> {
        self.entries
            .values_mut()
            .filter_map(|entry| Self::offer(entry, force, &mut filter))
            .collect()
    }

    /// Collect a delivery for a single subscriber
    pub(crate) fn notify_one(
        &mut self,
        index: usize,
        force: bool,
        mut filter: impl FnMut(M, bool) -> Option<P>,
    ) -> Option<Delivery<P>> {
        let entry = self.entries.get_mut(&index)?;
        Self::offer(entry, force, &mut filter)
    }

    fn offer(
        entry: &mut Entry<M, P>,
        force: bool,
        filter: &mut impl FnMut(M, bool) -> Option<P>,
    ) -> Option<Delivery<P>> {
        let payload = filter(entry.subscription, force || !entry.notified)?;
        entry.notified = true;
        if entry
            .last
            .as_ref()
            .is_some_and(|last| last.same_as(&payload))
        {
            return None;
        }
        entry.last = Some(payload.clone());
        Some(Delivery {
            callback: Rc::clone(&entry.callback),
            payload,
            alive: Rc::clone(&entry.alive),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Clone, Debug, PartialEq)]
    struct Payload(u32);

    impl Memo for Payload {
        fn same_as(&self, other: &Self) -> bool {
            self == other
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, Rc<dyn Fn(&Payload)>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, Rc::new(move |p: &Payload| sink.borrow_mut().push(p.0)))
    }

    #[test]
    fn test_first_notification_is_forced() {
        let mut hub: SubscriberHub<u8, Payload> = SubscriberHub::new();
        let (seen, callback) = recorder();
        hub.add(callback, 0);

        let mut forced = Vec::new();
        for delivery in hub.notify(false, |_, force| {
            forced.push(force);
            Some(Payload(1))
        }) {
            delivery.deliver();
        }
        for delivery in hub.notify(false, |_, force| {
            forced.push(force);
            force.then_some(Payload(2))
        }) {
            delivery.deliver();
        }
        assert_eq!(forced, vec![true, false]);
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_identical_payload_is_memoised() {
        let mut hub: SubscriberHub<u8, Payload> = SubscriberHub::new();
        let (seen, callback) = recorder();
        hub.add(callback, 0);
        for _ in 0..3 {
            for delivery in hub.notify(true, |_, _| Some(Payload(7))) {
                delivery.deliver();
            }
        }
        assert_eq!(*seen.borrow(), vec![7]);
    }

    #[test]
    fn test_removed_subscriber_skips_pending_delivery() {
        let mut hub: SubscriberHub<u8, Payload> = SubscriberHub::new();
        let (seen, callback) = recorder();
        let index = hub.add(callback, 0);
        let pending = hub.notify(true, |_, _| Some(Payload(1)));
        assert!(hub.remove(index));
        for delivery in pending {
            delivery.deliver();
        }
        assert!(seen.borrow().is_empty());
        assert!(hub.is_empty());
    }

    #[test]
    fn test_indexes_are_stable() {
        let mut hub: SubscriberHub<u8, Payload> = SubscriberHub::new();
        let (_, callback) = recorder();
        let a = hub.add(Rc::clone(&callback), 0);
        let b = hub.add(Rc::clone(&callback), 0);
        hub.remove(a);
        let c = hub.add(callback, 0);
        assert!(hub.contains(b));
        assert_eq!(c, 2);
        assert_eq!(hub.len(), 2);
    }
}

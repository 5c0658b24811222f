//! Per-type subscriber lists with an id catalog.
//!
//! The registry keeps two indices that must agree:
//!
//! - `subscribers`: message type → subscribers in registration order
//! - `catalog`: subscription id → message type
//!
//! Both are private and only change through `subscribe`, `unsubscribe`
//! and `unsubscribe_all`, which update them together.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::SubscriptionId;
use crate::protocol::Envelope;

// ============================================================================
// Types
// ============================================================================

/// Subscriber callback, invoked with the envelope payload.
pub type Callback<P> = Arc<dyn Fn(&P) + Send + Sync>;

// ============================================================================
// Subscriber
// ============================================================================

/// One registered callback.
pub struct Subscriber<P> {
    /// Subscription id.
    id: SubscriptionId,
    /// Callback.
    callback: Callback<P>,
}

impl<P> Subscriber<P> {
    /// Returns the subscription id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Invokes the callback, containing any panic.
    ///
    /// Returns `false` if the callback panicked.
    pub fn invoke(&self, data: &P) -> bool {
        let callback = &self.callback;
        match catch_unwind(AssertUnwindSafe(|| callback(data))) {
            Ok(()) => true,
            Err(_) => {
                warn!(subscription = %self.id, "Subscriber panicked");
                false
            }
        }
    }
}

impl<P> Clone for Subscriber<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<P> fmt::Debug for Subscriber<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Invokes every subscriber in order. One panicking subscriber does not
/// stop the rest.
///
/// Returns the number of subscribers that completed normally.
pub fn deliver<P>(subscribers: &[Subscriber<P>], data: &P) -> usize {
    subscribers
        .iter()
        .filter(|subscriber| subscriber.invoke(data))
        .count()
}

// ============================================================================
// SubscriptionRegistry
// ============================================================================

/// Maps message types to subscriber callbacks.
pub struct SubscriptionRegistry<P> {
    /// Subscribers by message type, in registration order.
    subscribers: FxHashMap<String, Vec<Subscriber<P>>>,
    /// Message type by subscription id.
    catalog: FxHashMap<SubscriptionId, String>,
    /// Last issued id value.
    last_id: u64,
}

impl<P> Default for SubscriptionRegistry<P> {
    fn default() -> Self {
        Self {
            subscribers: FxHashMap::default(),
            catalog: FxHashMap::default(),
            last_id: 0,
        }
    }
}

impl<P> fmt::Debug for SubscriptionRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("types", &self.subscribers.len())
            .field("subscriptions", &self.catalog.len())
            .finish()
    }
}

impl<P> SubscriptionRegistry<P> {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for messages of type `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `kind` is empty or blank. The
    /// registry is left unchanged.
    pub fn subscribe(&mut self, kind: &str, callback: Callback<P>) -> Result<SubscriptionId> {
        validate_kind(kind)?;

        self.last_id += 1;
        let id = SubscriptionId::new(self.last_id);

        self.subscribers
            .entry(kind.to_string())
            .or_default()
            .push(Subscriber { id, callback });
        self.catalog.insert(id, kind.to_string());

        trace!(subscription = %id, kind, "Subscribed");
        Ok(id)
    }

    /// Removes the subscription `id`.
    ///
    /// Returns `false` if `id` is unknown.
    pub fn unsubscribe(&mut self, id: &SubscriptionId) -> bool {
        let Some(kind) = self.catalog.remove(id) else {
            return false;
        };

        if let Some(list) = self.subscribers.get_mut(&kind) {
            if let Some(index) = list.iter().position(|subscriber| subscriber.id == *id) {
                list.remove(index);
            }
            if list.is_empty() {
                self.subscribers.remove(&kind);
            }
        }

        trace!(subscription = %id, kind = %kind, "Unsubscribed");
        true
    }

    /// Removes every subscription. Issued ids are not reused.
    pub fn unsubscribe_all(&mut self) {
        self.subscribers.clear();
        self.catalog.clear();
    }

    /// Returns a copy of the subscribers for `kind`.
    ///
    /// Dispatch iterates this copy, so callbacks may subscribe or
    /// unsubscribe while it runs without skipping or repeating anyone.
    #[must_use]
    pub fn snapshot(&self, kind: &str) -> Vec<Subscriber<P>> {
        self.subscribers.get(kind).cloned().unwrap_or_default()
    }

    /// Invokes every subscriber of `envelope.kind` with its payload.
    ///
    /// Returns the number of subscribers that completed normally.
    pub fn dispatch(&self, envelope: &Envelope<P>) -> usize {
        deliver(&self.snapshot(&envelope.kind), &envelope.data)
    }

    /// Returns the message type of subscription `id`.
    #[must_use]
    pub fn kind_of(&self, id: &SubscriptionId) -> Option<&str> {
        self.catalog.get(id).map(String::as_str)
    }

    /// Returns the number of subscribers for `kind`.
    #[must_use]
    pub fn count(&self, kind: &str) -> usize {
        self.subscribers.get(kind).map_or(0, Vec::len)
    }

    /// Returns the total number of subscriptions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    /// Returns `true` if there are no subscriptions.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}

/// Rejects empty or blank message types.
pub(crate) fn validate_kind(kind: &str) -> Result<()> {
    if kind.trim().is_empty() {
        warn!(kind, "Rejected blank message type");
        return Err(Error::invalid_argument("message type must be a non-empty string"));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use proptest::prelude::*;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, name: &str) -> Callback<i32> {
        let log = Arc::clone(log);
        let name = name.to_string();
        Arc::new(move |data: &i32| log.lock().push(format!("{name}:{data}")))
    }

    /// Every catalog entry has exactly one list entry and vice versa.
    fn assert_consistent<P>(registry: &SubscriptionRegistry<P>) {
        let listed: usize = registry.subscribers.values().map(Vec::len).sum();
        assert_eq!(listed, registry.catalog.len());
        for (kind, list) in &registry.subscribers {
            assert!(!list.is_empty());
            for subscriber in list {
                assert_eq!(registry.catalog.get(&subscriber.id), Some(kind));
            }
        }
    }

    #[test]
    fn test_fan_out_in_registration_order() {
        let log = Log::default();
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe("x", recorder(&log, "a")).unwrap();
        registry.subscribe("x", recorder(&log, "b")).unwrap();
        registry.subscribe("y", recorder(&log, "c")).unwrap();

        assert_eq!(registry.dispatch(&Envelope::new("x", 5)), 2);
        assert_eq!(*log.lock(), vec!["a:5", "b:5"]);
        assert_consistent(&registry);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_id() {
        let log = Log::default();
        let mut registry = SubscriptionRegistry::new();
        let first = registry.subscribe("x", recorder(&log, "a")).unwrap();
        let second = registry.subscribe("x", recorder(&log, "b")).unwrap();
        let third = registry.subscribe("x", recorder(&log, "c")).unwrap();

        assert!(registry.unsubscribe(&second));
        assert!(!registry.unsubscribe(&second));
        assert_eq!(registry.kind_of(&first), Some("x"));
        assert_eq!(registry.kind_of(&second), None);

        registry.dispatch(&Envelope::new("x", 1));
        assert_eq!(*log.lock(), vec!["a:1", "c:1"]);

        registry.unsubscribe(&first);
        registry.unsubscribe(&third);
        assert!(registry.is_empty());
        assert_eq!(registry.count("x"), 0);
        assert_consistent(&registry);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut registry = SubscriptionRegistry::<i32>::new();
        assert!(!registry.unsubscribe(&SubscriptionId::new(99)));
    }

    #[test]
    fn test_unsubscribe_all() {
        let log = Log::default();
        let mut registry = SubscriptionRegistry::new();
        let before = registry.subscribe("x", recorder(&log, "a")).unwrap();
        registry.subscribe("y", recorder(&log, "b")).unwrap();

        registry.unsubscribe_all();
        assert_eq!(registry.dispatch(&Envelope::new("x", 1)), 0);
        assert_eq!(registry.dispatch(&Envelope::new("y", 1)), 0);
        assert!(log.lock().is_empty());

        let after = registry.subscribe("x", recorder(&log, "a")).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_blank_kind_rejected() {
        let log = Log::default();
        let mut registry = SubscriptionRegistry::new();

        for kind in ["", "   "] {
            let err = registry.subscribe(kind, recorder(&log, "a")).unwrap_err();
            assert!(err.is_invalid_argument());
        }
        assert!(registry.is_empty());
        assert_consistent(&registry);
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let log = Log::default();
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe("x", recorder(&log, "a")).unwrap();
        registry
            .subscribe("x", Arc::new(|_: &i32| panic!("subscriber failure")))
            .unwrap();
        registry.subscribe("x", recorder(&log, "c")).unwrap();

        assert_eq!(registry.dispatch(&Envelope::new("x", 3)), 2);
        assert_eq!(*log.lock(), vec!["a:3", "c:3"]);
    }

    #[test]
    fn test_dispatch_unknown_kind_is_noop() {
        let registry = SubscriptionRegistry::<i32>::new();
        assert_eq!(registry.dispatch(&Envelope::new("nobody", 1)), 0);
    }

    proptest! {
        #[test]
        fn prop_fan_out_follows_registration(kinds in prop::collection::vec(0u8..3, 1..20)) {
            let log = Log::default();
            let mut registry = SubscriptionRegistry::new();
            for (index, kind) in kinds.iter().enumerate() {
                registry
                    .subscribe(&format!("k{kind}"), recorder(&log, &index.to_string()))
                    .unwrap();
            }

            registry.dispatch(&Envelope::new("k0", 0));

            let expected: Vec<String> = kinds
                .iter()
                .enumerate()
                .filter(|(_, kind)| **kind == 0)
                .map(|(index, _)| format!("{index}:0"))
                .collect();
            prop_assert_eq!(log.lock().clone(), expected);
        }

        #[test]
        fn prop_indices_stay_consistent(ops in prop::collection::vec((any::<bool>(), 0u8..3, 0u64..10), 0..40)) {
            let mut registry = SubscriptionRegistry::<i32>::new();
            for (add, kind, id) in ops {
                if add {
                    registry.subscribe(&format!("k{kind}"), Arc::new(|_: &i32| {})).unwrap();
                } else {
                    registry.unsubscribe(&SubscriptionId::new(id));
                }
                assert_consistent(&registry);
            }
        }
    }
}

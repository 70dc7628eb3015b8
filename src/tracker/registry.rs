//! In-memory subscription registry
//!
//! The registry is the only shared mutable state of the tracker. It starts
//! empty and lives until process exit; a persistent store would sit behind
//! the same four operations.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use super::key::SubscriptionKey;
use super::subscription::Subscription;
use crate::common::errors::{Result, TrackerError};

/// Snapshot of registered keys; clone it to iterate again
pub type ActiveKeys = std::vec::IntoIter<SubscriptionKey>;

/// Owns every registered [`Subscription`], keyed by [`SubscriptionKey`]
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: RwLock<HashMap<SubscriptionKey, Subscription>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SubscriptionKey, Subscription>> {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SubscriptionKey, Subscription>> {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `subscription` under `key`
    ///
    /// Fails with `DuplicateSubscription` if the key is taken; the existing
    /// record is left untouched.
    pub fn add(&self, key: SubscriptionKey, subscription: Subscription) -> Result<()> {
        let mut subscriptions = self.write();
        if subscriptions.contains_key(&key) {
            return Err(TrackerError::DuplicateSubscription(key.to_string()));
        }
        debug!(%key, "Registering subscription");
        subscriptions.insert(key, subscription);
        Ok(())
    }

    /// Remove the subscription for `key` and return it in the Stopped state
    ///
    /// The status flip happens under the same write lock as the removal, so
    /// no reader ever sees a registered Stopped record.
    pub fn remove(&self, key: &SubscriptionKey) -> Result<Subscription> {
        let mut removed = self
            .write()
            .remove(key)
            .ok_or_else(|| TrackerError::NotFound(key.to_string()))?;
        removed.mark_stopped();
        debug!(%key, "Removed subscription");
        Ok(removed)
    }

    /// Look up the subscription for `key`
    pub fn get(&self, key: &SubscriptionKey) -> Option<Subscription> {
        self.read().get(key).cloned()
    }

    pub fn contains(&self, key: &SubscriptionKey) -> bool {
        self.read().contains_key(key)
    }

    /// Keys registered at call time, optionally for one subscriber only
    ///
    /// Order is unspecified and may differ between calls.
    pub fn list_active(&self, subscriber_id: Option<&str>) -> ActiveKeys {
        let keys: Vec<SubscriptionKey> = self
            .read()
            .values()
            .filter(|s| s.is_active())
            .filter(|s| subscriber_id.map_or(true, |id| s.key().subscriber_id() == id))
            .map(|s| s.key().clone())
            .collect();
        keys.into_iter()
    }

    /// Number of registered subscriptions
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::subscription::SubscriptionStatus;
    use pretty_assertions::assert_eq;

    const ADDR: &str = "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb";

    fn key(subscriber: &str, threshold: &str) -> SubscriptionKey {
        SubscriptionKey::new(subscriber, ADDR, threshold).unwrap()
    }

    fn sub(key: &SubscriptionKey) -> Subscription {
        Subscription::new(key.clone()).unwrap()
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.list_active(None).count(), 0);
    }

    #[test]
    fn test_duplicate_add_keeps_original() {
        let registry = SubscriptionRegistry::new();
        let k = key("1", "1.00");
        let first = sub(&k);
        let second = sub(&k);

        registry.add(k.clone(), first.clone()).unwrap();
        let err = registry.add(k.clone(), second).unwrap_err();

        assert!(matches!(err, TrackerError::DuplicateSubscription(_)));
        assert_eq!(registry.get(&k), Some(first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_twice_is_not_found() {
        let registry = SubscriptionRegistry::new();
        let k = key("1", "1.00");
        registry.add(k.clone(), sub(&k)).unwrap();

        let removed = registry.remove(&k).unwrap();
        assert_eq!(removed.status(), SubscriptionStatus::Stopped);
        assert!(registry.get(&k).is_none());

        let err = registry.remove(&k).unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_active_is_a_snapshot() {
        let registry = SubscriptionRegistry::new();
        let a = key("1", "1.00");
        let b = key("2", "1.00");
        registry.add(a.clone(), sub(&a)).unwrap();
        registry.add(b.clone(), sub(&b)).unwrap();

        let snapshot = registry.list_active(None);
        registry.remove(&a).unwrap();

        let mut listed: Vec<_> = snapshot.clone().collect();
        listed.sort();
        assert_eq!(listed, vec![a.clone(), b.clone()]);
        // restartable
        assert_eq!(snapshot.count(), 2);

        assert_eq!(registry.list_active(None).collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_list_active_filters_by_subscriber() {
        let registry = SubscriptionRegistry::new();
        for k in [key("1", "1.00"), key("1", "2.00"), key("2", "1.00")] {
            registry.add(k.clone(), sub(&k)).unwrap();
        }

        assert_eq!(registry.list_active(Some("1")).count(), 2);
        assert_eq!(registry.list_active(Some("2")).count(), 1);
        assert_eq!(registry.list_active(Some("3")).count(), 0);
        assert_eq!(registry.list_active(None).count(), 3);
    }
}

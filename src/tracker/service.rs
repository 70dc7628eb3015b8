//! Caller-facing start / stop / list operations

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::instrument;

use super::key::SubscriptionKey;
use super::registry::{ActiveKeys, SubscriptionRegistry};
use super::scheduler::{PollingScheduler, SchedulerConfig};
use super::subscription::Subscription;
use crate::common::errors::Result;
use crate::common::traits::{BalanceSource, Notifier};
use crate::common::types::TrackerEvent;

/// Successful outcome of a start or stop request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Started(SubscriptionKey),
    Stopped(SubscriptionKey),
}

impl Ack {
    pub fn key(&self) -> &SubscriptionKey {
        match self {
            Ack::Started(key) | Ack::Stopped(key) => key,
        }
    }
}

/// Registry and scheduler wired together
pub struct BalanceTracker {
    registry: Arc<SubscriptionRegistry>,
    scheduler: PollingScheduler,
}

impl BalanceTracker {
    /// Create a tracker with an empty registry
    pub fn new(
        balance_source: Arc<dyn BalanceSource>,
        notifier: Arc<dyn Notifier>,
        config: SchedulerConfig,
    ) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let scheduler =
            PollingScheduler::with_config(Arc::clone(&registry), balance_source, notifier, config);
        Self {
            registry,
            scheduler,
        }
    }

    /// Start tracking `address` for `subscriber_id` below `threshold`
    ///
    /// # Errors
    /// `InvalidAddress`, `InvalidThresholdFormat` or `DuplicateSubscription`
    #[instrument(skip(self))]
    pub fn start(&self, subscriber_id: &str, address: &str, threshold: &str) -> Result<Ack> {
        let key = SubscriptionKey::new(subscriber_id, address, threshold)?;
        let subscription = Subscription::new(key.clone())?;

        self.scheduler.register_and_start(key.clone(), subscription)?;
        Ok(Ack::Started(key))
    }

    /// Stop tracking the exact (subscriber, address, threshold) triple
    ///
    /// # Errors
    /// `InvalidAddress`, `InvalidThresholdFormat` or `NotFound`
    #[instrument(skip(self))]
    pub fn stop(&self, subscriber_id: &str, address: &str, threshold: &str) -> Result<Ack> {
        let key = SubscriptionKey::new(subscriber_id, address, threshold)?;
        self.scheduler.retire(&key)?;
        Ok(Ack::Stopped(key))
    }

    /// Keys currently tracked, optionally for one subscriber
    pub fn list(&self, subscriber_id: Option<&str>) -> ActiveKeys {
        self.registry.list_active(subscriber_id)
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &PollingScheduler {
        &self.scheduler
    }

    /// Receive lifecycle and failure events from now on
    pub fn subscribe_events(&self) -> broadcast::Receiver<TrackerEvent> {
        self.scheduler.subscribe_events()
    }

    /// Stop every subscription
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}

//! Polling scheduler: one recurring timer per active subscription
//!
//! # Tick protocol
//!
//! ```text
//!  timer fires
//!      │
//!      ▼
//!  registry.get(key) ── absent / stopped ──▶ end timer silently
//!      │
//!      ▼
//!  balance_source.get_balance(address) ── error / panic ──▶ retire(key), report
//!      │
//!      ▼
//!  balance < threshold ? ── no ──▶ wait for next tick
//!      │ yes
//!      ▼
//!  still registered ? ── no ──▶ end timer silently
//!      │ yes
//!      ▼
//!  notifier.notify(subscriber, message) ── error ──▶ report, stay active
//! ```
//!
//! Each key owns a single task that awaits its own tick, so ticks for the
//! same key never overlap. Deadlines that pass while a tick is in flight are
//! skipped, not replayed.
//!
//! Every stop goes through [`PollingScheduler::retire`]'s primitive, which
//! drops the timer and the registry entry while holding the timer map lock.
//! Registration takes the same lock, so a stop can never land between the
//! registry insert and the timer bind.
//!
//! Each timer carries an id. A tick only ever retires or releases the timer
//! it was spawned for, so a late tick from a stopped subscription cannot
//! touch a newer subscription for the same key.

use chrono::Utc;
use futures_util::FutureExt;
use rust_decimal::Decimal;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::key::SubscriptionKey;
use super::registry::SubscriptionRegistry;
use super::subscription::Subscription;
use crate::common::channels::{create_event_channel_with_size, DEFAULT_CHANNEL_SIZE};
use crate::common::errors::{Result, TrackerError};
use crate::common::traits::{BalanceSource, Notifier};
use crate::common::types::{StopReason, TrackerEvent};

/// Default time between two checks of the same subscription
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Smallest interval the scheduler will run with
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Scheduler settings
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between two ticks of the same subscription
    pub poll_interval: Duration,
    /// Currency label used in alert messages
    pub currency_symbol: String,
    /// Capacity of the event broadcast channel
    pub event_channel_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            currency_symbol: "ETH".to_string(),
            event_channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }
}

/// Cancellation side of a running timer
struct TimerHandle {
    id: u64,
    cancel: CancellationToken,
    // Dropping the handle detaches the task; cancellation stops it.
    _task: JoinHandle<()>,
}

/// What a tick tells its timer loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickOutcome {
    Continue,
    Finished,
}

/// Result of the single retirement primitive
struct Retirement {
    had_timer: bool,
    subscription: Result<Subscription>,
}

type TimerMap = HashMap<SubscriptionKey, TimerHandle>;

/// State shared between the scheduler and its timer tasks
struct Shared {
    registry: Arc<SubscriptionRegistry>,
    balance_source: Arc<dyn BalanceSource>,
    notifier: Arc<dyn Notifier>,
    timers: Mutex<TimerMap>,
    next_timer_id: AtomicU64,
    events: broadcast::Sender<TrackerEvent>,
    currency_symbol: String,
}

/// Binds a recurring balance check to each active subscription
pub struct PollingScheduler {
    shared: Arc<Shared>,
    poll_interval: Duration,
}

impl PollingScheduler {
    /// Create a scheduler with the default 10 minute interval
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        balance_source: Arc<dyn BalanceSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_config(registry, balance_source, notifier, SchedulerConfig::default())
    }

    /// Create a scheduler with custom settings
    pub fn with_config(
        registry: Arc<SubscriptionRegistry>,
        balance_source: Arc<dyn BalanceSource>,
        notifier: Arc<dyn Notifier>,
        config: SchedulerConfig,
    ) -> Self {
        let (events, _) = create_event_channel_with_size(config.event_channel_size);

        Self {
            shared: Arc::new(Shared {
                registry,
                balance_source,
                notifier,
                timers: Mutex::new(HashMap::new()),
                next_timer_id: AtomicU64::new(1),
                events,
                currency_symbol: config.currency_symbol,
            }),
            poll_interval: config.poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Receive lifecycle and failure events from now on
    pub fn subscribe_events(&self) -> broadcast::Receiver<TrackerEvent> {
        self.shared.events.subscribe()
    }

    /// Bind a recurring timer to `key`; the first tick fires one interval from now
    ///
    /// The caller must have registered `subscription` beforehand; uniqueness
    /// is the registry's job. Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// * `SubscriptionStopped` if `subscription` is not Active
    /// * `AlreadyTracking` if a timer is already bound to `key`
    /// * `NotFound` if `key` is no longer registered
    pub fn start_tracking(&self, key: SubscriptionKey, subscription: Subscription) -> Result<()> {
        if !subscription.is_active() {
            return Err(TrackerError::SubscriptionStopped(key.to_string()));
        }

        let mut timers = self.shared.lock_timers();
        if timers.contains_key(&key) {
            return Err(TrackerError::AlreadyTracking(key.to_string()));
        }
        if !self.shared.registry.contains(&key) {
            return Err(TrackerError::NotFound(key.to_string()));
        }

        self.spawn_timer(&mut timers, &key);
        drop(timers);

        self.announce_started(key);
        Ok(())
    }

    /// Register `subscription` and bind its timer as one step
    ///
    /// A concurrent stop of the same key sees either nothing or both.
    ///
    /// # Errors
    /// * `SubscriptionStopped` if `subscription` is not Active
    /// * `DuplicateSubscription` if `key` is already registered
    pub fn register_and_start(&self, key: SubscriptionKey, subscription: Subscription) -> Result<()> {
        if !subscription.is_active() {
            return Err(TrackerError::SubscriptionStopped(key.to_string()));
        }

        let mut timers = self.shared.lock_timers();
        self.shared.registry.add(key.clone(), subscription)?;
        self.spawn_timer(&mut timers, &key);
        drop(timers);

        self.announce_started(key);
        Ok(())
    }

    /// Spawn the timer task for `key`; the caller holds the timer map lock
    fn spawn_timer(&self, timers: &mut TimerMap, key: &SubscriptionKey) {
        let id = self.shared.next_timer_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_timer(
            Arc::clone(&self.shared),
            key.clone(),
            self.poll_interval,
            cancel.clone(),
            id,
        ));

        let handle = TimerHandle {
            id,
            cancel,
            _task: task,
        };
        if let Some(replaced) = timers.insert(key.clone(), handle) {
            warn!(%key, timer_id = replaced.id, "Replacing orphaned timer");
            replaced.cancel.cancel();
        }
    }

    fn announce_started(&self, key: SubscriptionKey) {
        info!(%key, interval_secs = self.poll_interval.as_secs(), "Started tracking");
        self.shared.publish(TrackerEvent::Started {
            key,
            timestamp: Utc::now(),
        });
    }

    /// Cancel the timer bound to `key` and drop its registry entry
    ///
    /// A tick already in flight may finish, but it will not notify and no
    /// further tick starts once this returns.
    ///
    /// # Errors
    /// * `NotTracking` if no timer is bound to `key`
    pub fn stop_tracking(&self, key: &SubscriptionKey) -> Result<()> {
        let retirement = self.shared.retire(key, StopReason::UserCancelled, None);
        if !retirement.had_timer {
            return Err(TrackerError::NotTracking(key.to_string()));
        }
        Ok(())
    }

    /// Stop `key` on behalf of a subscriber and return the stopped record
    ///
    /// # Errors
    /// * `NotFound` if no subscription is registered for `key`
    pub fn retire(&self, key: &SubscriptionKey) -> Result<Subscription> {
        self.shared
            .retire(key, StopReason::UserCancelled, None)
            .subscription
    }

    pub fn is_tracking(&self, key: &SubscriptionKey) -> bool {
        self.shared.lock_timers().contains_key(key)
    }

    /// Number of running timers
    pub fn tracked_count(&self) -> usize {
        self.shared.lock_timers().len()
    }

    /// Stop every timer and drop every tracked subscription
    pub fn shutdown(&self) {
        let keys: Vec<SubscriptionKey> = self.shared.lock_timers().keys().cloned().collect();
        if keys.is_empty() {
            return;
        }
        info!("Shutting down {} timers", keys.len());
        for key in keys {
            self.shared.retire(&key, StopReason::Shutdown, None);
        }
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    fn lock_timers(&self) -> MutexGuard<'_, TimerMap> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: TrackerEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// The only way a subscription stops: timer and registry entry go together
    fn retire(
        &self,
        key: &SubscriptionKey,
        reason: StopReason,
        error: Option<String>,
    ) -> Retirement {
        let timers = self.lock_timers();
        self.retire_locked(timers, key, reason, error)
    }

    /// [`Shared::retire`], but only while timer `timer_id` is still the one bound to `key`
    fn retire_own(
        &self,
        key: &SubscriptionKey,
        timer_id: u64,
        reason: StopReason,
        error: Option<String>,
    ) {
        let timers = self.lock_timers();
        if timers.get(key).map(|timer| timer.id) != Some(timer_id) {
            debug!(%key, timer_id, "Timer already replaced, leaving current subscription alone");
            return;
        }
        self.retire_locked(timers, key, reason, error);
    }

    /// Drop timer `timer_id` from the map without touching the registry
    fn release_own(&self, key: &SubscriptionKey, timer_id: u64) {
        let mut timers = self.lock_timers();
        if timers.get(key).map(|timer| timer.id) == Some(timer_id) {
            warn!(%key, timer_id, "Releasing timer of an unregistered subscription");
            timers.remove(key);
        }
    }

    fn retire_locked(
        &self,
        mut timers: MutexGuard<'_, TimerMap>,
        key: &SubscriptionKey,
        reason: StopReason,
        error: Option<String>,
    ) -> Retirement {
        let timer = timers.remove(key);
        if let Some(timer) = &timer {
            timer.cancel.cancel();
        }
        let subscription = self.registry.remove(key);
        drop(timers);

        let had_timer = timer.is_some();
        if had_timer || subscription.is_ok() {
            info!(%key, %reason, "Stopped tracking");
            self.publish(TrackerEvent::Stopped {
                key: key.clone(),
                reason,
                error,
                timestamp: Utc::now(),
            });
        }

        Retirement {
            had_timer,
            subscription,
        }
    }

    #[instrument(skip_all, fields(key = %key, timer_id = timer_id))]
    async fn tick(
        &self,
        key: &SubscriptionKey,
        timer_id: u64,
        cancel: &CancellationToken,
    ) -> TickOutcome {
        if cancel.is_cancelled() {
            return TickOutcome::Finished;
        }

        let subscription = match self.registry.get(key) {
            Some(subscription) if subscription.is_active() => subscription,
            _ => {
                debug!("Subscription gone, ending timer");
                self.release_own(key, timer_id);
                return TickOutcome::Finished;
            }
        };

        let lookup = AssertUnwindSafe(self.balance_source.get_balance(key.address()))
            .catch_unwind()
            .await;

        let balance = match lookup {
            Ok(Ok(balance)) => balance,
            Ok(Err(e)) => {
                self.retire_after_failure(key, timer_id, e.to_string());
                return TickOutcome::Finished;
            }
            Err(panic) => {
                self.retire_after_failure(key, timer_id, panic_message(panic.as_ref()));
                return TickOutcome::Finished;
            }
        };

        let below_threshold = subscription.is_below_threshold(balance);
        self.publish(TrackerEvent::Checked {
            key: key.clone(),
            balance,
            below_threshold,
            timestamp: Utc::now(),
        });

        if !below_threshold {
            debug!(%balance, "Balance at or above threshold");
            return TickOutcome::Continue;
        }

        // A stop that completed during the lookup wins over the alert
        if cancel.is_cancelled() || !self.registry.contains(key) {
            debug!("Stopped during balance lookup, skipping alert");
            return TickOutcome::Finished;
        }

        let message = alert_message(key, balance, &self.currency_symbol);
        let delivery = AssertUnwindSafe(self.notifier.notify(key.subscriber_id(), &message))
            .catch_unwind()
            .await;

        let failure = match delivery {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(panic) => Some(panic_message(panic.as_ref())),
        };

        match failure {
            None => {
                info!(%balance, "Alert delivered");
                self.publish(TrackerEvent::Alerted {
                    key: key.clone(),
                    balance,
                    timestamp: Utc::now(),
                });
            }
            Some(error) => {
                warn!(%balance, "Failed to deliver alert: {}", error);
                self.publish(TrackerEvent::NotifyFailed {
                    key: key.clone(),
                    error,
                    timestamp: Utc::now(),
                });
            }
        }

        TickOutcome::Continue
    }

    fn retire_after_failure(&self, key: &SubscriptionKey, timer_id: u64, error: String) {
        error!(
            source = self.balance_source.source_name(),
            "Balance lookup failed: {}", error
        );
        self.retire_own(key, timer_id, StopReason::RetiredByError, Some(error));
    }
}

/// Timer loop for a single key
async fn run_timer(
    shared: Arc<Shared>,
    key: SubscriptionKey,
    period: Duration,
    cancel: CancellationToken,
    timer_id: u64,
) {
    let mut deadline = Instant::now() + period;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep_until(deadline) => {}
        }

        if shared.tick(&key, timer_id, &cancel).await == TickOutcome::Finished {
            break;
        }

        deadline = next_deadline(deadline, period, Instant::now());
    }

    debug!(%key, "Timer ended");
}

/// First deadline on the `last + k * period` grid that is still in the future
fn next_deadline(last: Instant, period: Duration, now: Instant) -> Instant {
    let mut next = last + period;
    while next <= now {
        next += period;
    }
    next
}

/// Alert text naming the address, the configured floor and the current balance
pub fn alert_message(key: &SubscriptionKey, balance: Decimal, currency_symbol: &str) -> String {
    format!(
        "🔴 The address {address} funds have been decreased under {threshold} {currency}.\n\
         Current balance of the {address} is: {balance} {currency}",
        address = key.address(),
        threshold = key.threshold_text(),
        balance = balance,
        currency = currency_symbol,
    )
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

//! Subscription tracking core
//!
//! # Components
//!
//! - [`SubscriptionKey`]: validated (subscriber, address, threshold) identity
//! - [`Subscription`]: record with an Active → Stopped lifecycle
//! - [`SubscriptionRegistry`]: owns every subscription, enforces uniqueness
//! - [`PollingScheduler`]: one recurring balance check per subscription
//! - [`BalanceTracker`]: start / stop / list for callers
//!
//! The registry is built empty and injected into the scheduler; nothing here
//! is process-global.

pub mod key;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod subscription;

pub use key::{is_valid_threshold, SubscriptionKey};
pub use registry::{ActiveKeys, SubscriptionRegistry};
pub use scheduler::{alert_message, PollingScheduler, SchedulerConfig, DEFAULT_POLL_INTERVAL};
pub use service::{Ack, BalanceTracker};
pub use subscription::{Subscription, SubscriptionStatus};

//! BalanceWatch Library
//!
//! Tracks on-chain account balances for chat subscribers and alerts them
//! when a balance drops below the floor they registered.

pub mod common;
pub mod config;
pub mod ethereum;
pub mod telegram;
pub mod tracker;

// Re-export commonly used types
pub use common::errors::{ErrorKind, Result, TrackerError};
pub use common::traits::{BalanceSource, Notifier};
pub use common::types::{StopReason, TrackerEvent};
pub use config::types::AppConfig;
pub use ethereum::rpc::EthRpcBalanceSource;
pub use telegram::bot::TelegramBot;
pub use telegram::client::TelegramClient;

// Tracker types
pub use tracker::{
    Ack, ActiveKeys, BalanceTracker, PollingScheduler, SchedulerConfig, Subscription,
    SubscriptionKey, SubscriptionRegistry, SubscriptionStatus,
};

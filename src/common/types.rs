//! Types shared between the tracker and its observers

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tracker::key::SubscriptionKey;

/// Why a subscription left the Active state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The subscriber asked to stop
    UserCancelled,
    /// The balance source failed during a tick
    RetiredByError,
    /// The scheduler was shut down
    Shutdown,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::UserCancelled => write!(f, "user_cancelled"),
            StopReason::RetiredByError => write!(f, "retired_by_error"),
            StopReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Lifecycle and check events published by the scheduler
///
/// This is the observability channel for failures that happen inside a
/// tick, where there is no caller to return an error to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerEvent {
    /// A timer was bound to a new subscription
    Started {
        key: SubscriptionKey,
        timestamp: DateTime<Utc>,
    },
    /// A tick completed a balance lookup
    Checked {
        key: SubscriptionKey,
        balance: Decimal,
        below_threshold: bool,
        timestamp: DateTime<Utc>,
    },
    /// An alert was delivered
    Alerted {
        key: SubscriptionKey,
        balance: Decimal,
        timestamp: DateTime<Utc>,
    },
    /// The notifier failed; the subscription stays Active
    NotifyFailed {
        key: SubscriptionKey,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// The subscription was stopped and removed
    Stopped {
        key: SubscriptionKey,
        reason: StopReason,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl TrackerEvent {
    /// The key this event is about
    pub fn key(&self) -> &SubscriptionKey {
        match self {
            TrackerEvent::Started { key, .. }
            | TrackerEvent::Checked { key, .. }
            | TrackerEvent::Alerted { key, .. }
            | TrackerEvent::NotifyFailed { key, .. }
            | TrackerEvent::Stopped { key, .. } => key,
        }
    }

    /// True for the terminal event of a subscription
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackerEvent::Stopped { .. })
    }
}

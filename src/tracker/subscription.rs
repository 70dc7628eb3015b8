//! Subscription records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::key::SubscriptionKey;
use crate::common::errors::Result;

/// Lifecycle state of a subscription; `Stopped` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Stopped,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// One tracked (subscriber, address, threshold) triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    key: SubscriptionKey,
    threshold: Decimal,
    status: SubscriptionStatus,
    created_at: DateTime<Utc>,
}

impl Subscription {
    /// Create an Active subscription for `key`
    pub fn new(key: SubscriptionKey) -> Result<Self> {
        let threshold = key.parse_threshold()?;
        Ok(Self {
            key,
            threshold,
            status: SubscriptionStatus::Active,
            created_at: Utc::now(),
        })
    }

    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// Strict comparison: a balance equal to the floor is not an alert
    pub fn is_below_threshold(&self, balance: Decimal) -> bool {
        balance < self.threshold
    }

    /// Flip to Stopped. Only the registry calls this, while removing the record.
    pub(crate) fn mark_stopped(&mut self) {
        self.status = SubscriptionStatus::Stopped;
    }
}

//! Subscription identity

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::common::errors::{Result, TrackerError};
use crate::ethereum::address::is_valid_address;

static THRESHOLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\.[0-9]{2}$").expect("static regex"));

/// Check the strict `<digits>.<two digits>` threshold format
pub fn is_valid_threshold(text: &str) -> bool {
    THRESHOLD_RE.is_match(text)
}

/// Identity of a subscription: who is watching which address at which floor
///
/// Equality is textual on all three parts, so `"1.30"` and `"1.3"` would be
/// different keys (the second is rejected by validation anyway).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionKey {
    subscriber_id: String,
    address: String,
    threshold: String,
}

impl SubscriptionKey {
    /// Validate the parts and build a key
    ///
    /// # Errors
    /// * `InvalidAddress` if `address` is not an account address
    /// * `InvalidThresholdFormat` if `threshold` is not like `1.34`
    pub fn new(
        subscriber_id: impl Into<String>,
        address: impl Into<String>,
        threshold: impl Into<String>,
    ) -> Result<Self> {
        let address = address.into();
        let threshold = threshold.into();

        if !is_valid_address(&address) {
            return Err(TrackerError::InvalidAddress(address));
        }
        if !is_valid_threshold(&threshold) {
            return Err(TrackerError::InvalidThresholdFormat(threshold));
        }

        Ok(Self {
            subscriber_id: subscriber_id.into(),
            address,
            threshold,
        })
    }

    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Threshold exactly as the subscriber typed it
    pub fn threshold_text(&self) -> &str {
        &self.threshold
    }

    /// Numeric threshold used for comparisons
    pub fn parse_threshold(&self) -> Result<Decimal> {
        Decimal::from_str(&self.threshold)
            .map_err(|_| TrackerError::InvalidThresholdFormat(self.threshold.clone()))
    }
}

// Address and threshold never contain '-', so the last two separators are
// unambiguous even for negative chat ids.
impl std::fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.subscriber_id, self.address, self.threshold)
    }
}

impl FromStr for SubscriptionKey {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.rsplitn(3, '-');
        let threshold = parts.next().unwrap_or_default();
        let address = parts.next();
        let subscriber_id = parts.next();

        match (subscriber_id, address) {
            (Some(subscriber_id), Some(address)) => Self::new(subscriber_id, address, threshold),
            _ => Err(TrackerError::InvalidResponse(format!(
                "Malformed subscription key: {}",
                s
            ))),
        }
    }
}

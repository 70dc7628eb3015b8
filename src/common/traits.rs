//! Trait definitions for the tracker's collaborators

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::errors::Result;

/// Source of current account balances (an RPC node, an indexer, a fake in tests)
///
/// Every error is treated the same way by the scheduler: the subscription
/// that triggered the lookup is retired. Implementations own their timeout
/// behaviour; the scheduler imposes none.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Fetch the current balance of `address`, in whole units of the native currency
    async fn get_balance(&self, address: &str) -> Result<Decimal>;

    /// Short name used in logs
    fn source_name(&self) -> &'static str {
        "balance-source"
    }
}

/// Delivers messages to subscribers
///
/// Delivery is best effort. Errors are logged and reported on the event
/// channel, and never change subscription state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `message` to `subscriber_id`
    async fn notify(&self, subscriber_id: &str, message: &str) -> Result<()>;
}

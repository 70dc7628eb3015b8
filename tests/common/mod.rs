//! Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use balance_watch::common::traits::{BalanceSource, Notifier};
use balance_watch::{BalanceTracker, Result, SchedulerConfig, TrackerError, TrackerEvent};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Valid EIP-55 addresses
pub const ADDR_A: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const ADDR_B: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

/// Poll interval used by the scheduler tests
pub const INTERVAL: Duration = Duration::from_secs(600);

/// A little past the next tick
pub const SLACK: Duration = Duration::from_secs(1);

/// One scripted balance lookup
#[derive(Debug, Clone)]
pub enum Step {
    Balance(Decimal),
    Fail(&'static str),
    Panic,
}

/// Balance source that replays a per-address script, then a fallback balance
pub struct ScriptedBalanceSource {
    fallback: Decimal,
    delay: Option<Duration>,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBalanceSource {
    pub fn new(fallback: Decimal) -> Self {
        Self {
            fallback,
            delay: None,
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every lookup takes `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answers for `address`, consumed in order
    pub fn with_script(self, address: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(address.to_string(), steps.into());
        self
    }

    pub fn calls_for(&self, address: &str) -> usize {
        self.calls.lock().unwrap().get(address).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceSource for ScriptedBalanceSource {
    async fn get_balance(&self, address: &str) -> Result<Decimal> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_insert(0) += 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(address)
            .and_then(|steps| steps.pop_front());

        match step {
            None => Ok(self.fallback),
            Some(Step::Balance(balance)) => Ok(balance),
            Some(Step::Fail(message)) => Err(TrackerError::Rpc(message.to_string())),
            Some(Step::Panic) => panic!("scripted balance source panic"),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// Notifier that records every message
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subscriber_id: &str, message: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((subscriber_id.to_string(), message.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(TrackerError::Telegram("chat not found".to_string()));
        }
        Ok(())
    }
}

/// Tracker polling every [`INTERVAL`]
pub fn tracker_with(
    source: Arc<ScriptedBalanceSource>,
    notifier: Arc<RecordingNotifier>,
) -> BalanceTracker {
    BalanceTracker::new(
        source,
        notifier,
        SchedulerConfig {
            poll_interval: INTERVAL,
            ..SchedulerConfig::default()
        },
    )
}

/// Everything published so far
pub fn drain_events(events: &mut broadcast::Receiver<TrackerEvent>) -> Vec<TrackerEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Sample Telegram payloads
pub mod telegram_payloads {
    use serde_json::{json, Value};

    pub fn sent_message(chat_id: i64, text: &str) -> Value {
        json!({
            "ok": true,
            "result": {
                "message_id": 1,
                "chat": {"id": chat_id, "type": "private"},
                "text": text
            }
        })
    }

    pub fn text_update(update_id: i64, chat_id: i64, text: &str) -> Value {
        json!({
            "update_id": update_id,
            "message": {
                "message_id": update_id,
                "chat": {"id": chat_id, "type": "private"},
                "from": {"id": 7, "is_bot": false, "username": "alice"},
                "text": text
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_scripted_source_replays_then_falls_back() {
        let source = ScriptedBalanceSource::new(dec!(5.00))
            .with_script(ADDR_A, vec![Step::Balance(dec!(1.00)), Step::Fail("down")]);

        assert_eq!(source.get_balance(ADDR_A).await.unwrap(), dec!(1.00));
        assert!(source.get_balance(ADDR_A).await.is_err());
        assert_eq!(source.get_balance(ADDR_A).await.unwrap(), dec!(5.00));
        assert_eq!(source.get_balance(ADDR_B).await.unwrap(), dec!(5.00));
        assert_eq!(source.calls_for(ADDR_A), 3);
        assert_eq!(source.total_calls(), 4);
    }
}

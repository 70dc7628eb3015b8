//! Long-polling command loop

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::client::TelegramClient;
use super::commands::{bot_commands, execute, parse_command};
use super::messages::Update;
use crate::common::errors::Result;
use crate::common::types::{StopReason, TrackerEvent};
use crate::tracker::service::BalanceTracker;

/// Delay before retrying a failed getUpdates call
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Telegram front end for a [`BalanceTracker`]
pub struct TelegramBot {
    client: Arc<TelegramClient>,
    tracker: Arc<BalanceTracker>,
    currency_symbol: String,
    long_poll_timeout_seconds: u64,
    bot_username: Option<String>,
}

impl TelegramBot {
    pub fn new(
        client: Arc<TelegramClient>,
        tracker: Arc<BalanceTracker>,
        currency_symbol: impl Into<String>,
        long_poll_timeout_seconds: u64,
    ) -> Self {
        Self {
            client,
            tracker,
            currency_symbol: currency_symbol.into(),
            long_poll_timeout_seconds,
            bot_username: None,
        }
    }

    /// Only answer `/cmd@username` mentions addressed to this bot
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    /// Publish the command menu, then poll for updates until `shutdown` fires
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        if let Err(e) = self.client.set_my_commands(&bot_commands()).await {
            warn!("Failed to publish command menu: {}", e);
        }

        let forwarder = tokio::spawn(forward_retirements(
            Arc::clone(&self.client),
            Arc::clone(&self.tracker),
            shutdown.clone(),
        ));

        info!("Polling Telegram for updates");
        let mut offset: Option<i64> = None;

        loop {
            let updates = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                updates = self.client.get_updates(offset, self.long_poll_timeout_seconds) => updates,
            };

            match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(e) => {
                    warn!("getUpdates failed, retrying in {:?}: {}", RETRY_DELAY, e);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(RETRY_DELAY) => {}
                    }
                }
            }
        }

        forwarder.abort();
        info!("Stopped polling Telegram");
        Ok(())
    }

    /// Answer a single update; returns the reply that was sent, if any
    #[instrument(skip_all, fields(update_id = update.update_id))]
    pub async fn handle_update(&self, update: Update) -> Option<String> {
        let message = update.message?;
        let text = message.text?;
        let chat_id = message.chat.id.to_string();

        let reply = match parse_command(&text, self.bot_username.as_deref())? {
            Ok(command) => {
                debug!(?command, "Executing command");
                execute(&self.tracker, &chat_id, command, &self.currency_symbol)
            }
            Err(e) => e.to_string(),
        };

        if let Err(e) = self.client.send_message(&chat_id, &reply).await {
            error!("Failed to reply in chat {}: {}", chat_id, e);
        }
        Some(reply)
    }
}

/// Tell subscribers when one of their subscriptions was retired by an error
async fn forward_retirements(
    client: Arc<TelegramClient>,
    tracker: Arc<BalanceTracker>,
    shutdown: CancellationToken,
) {
    let mut events = tracker.subscribe_events();

    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => return,
            event = events.recv() => event,
        };

        match event {
            Ok(TrackerEvent::Stopped {
                key,
                reason: StopReason::RetiredByError,
                error,
                ..
            }) => {
                let text = format!(
                    "🔴 Stopped tracking {} below {}: {}",
                    key.address(),
                    key.threshold_text(),
                    error.unwrap_or_else(|| "balance lookup failed".to_string())
                );
                if let Err(e) = client.send_message(key.subscriber_id(), &text).await {
                    warn!("Failed to report retirement of {}: {}", key, e);
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event forwarder lagged, {} events dropped", skipped);
            }
            Err(RecvError::Closed) => return,
        }
    }
}

//! Telegram Bot API client

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::messages::*;
use crate::common::errors::{Result, TrackerError};
use crate::common::traits::Notifier;

/// HTTP client for the Bot API; also the tracker's [`Notifier`]
#[derive(Clone)]
pub struct TelegramClient {
    /// HTTP client
    client: Client,
    /// `{api_url}/bot{token}`; never logged
    base_url: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient").finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Create a new client with the default 30s timeout
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        Self::with_timeout(api_url, token, Duration::from_secs(30))
    }

    /// Create a new client with custom timeout
    ///
    /// The timeout must exceed the getUpdates long polling timeout.
    pub fn with_timeout(api_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        if token.is_empty() {
            return Err(TrackerError::Configuration(
                "Telegram token must be provided".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrackerError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    /// Call a Bot API method and unwrap its envelope
    async fn call<P, T>(&self, method: &str, params: &P) -> Result<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, method);
        debug!("Calling Telegram method: {}", method);

        let response = self.client.post(&url).json(params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // Telegram answers errors with the same envelope and a non-2xx status
        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|_| {
            TrackerError::Telegram(format!("{} returned status {}: {}", method, status, body))
        })?;

        if !envelope.ok {
            return Err(TrackerError::Telegram(format!(
                "{} failed ({}): {}",
                method,
                envelope.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                envelope.description.unwrap_or_default()
            )));
        }

        envelope
            .result
            .ok_or_else(|| TrackerError::InvalidResponse(format!("{} returned no result", method)))
    }

    /// Send a plain text message
    #[instrument(skip(self, text))]
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let _: Message = self
            .call("sendMessage", &SendMessageRequest::new(chat_id, text))
            .await?;
        Ok(())
    }

    /// Long-poll for updates after `offset`
    #[instrument(skip(self))]
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message".to_string()],
        };
        self.call("getUpdates", &request).await
    }

    /// Publish the command menu
    #[instrument(skip_all)]
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<()> {
        let _: bool = self
            .call("setMyCommands", &SetMyCommandsRequest { commands })
            .await?;
        Ok(())
    }

    /// Identity of the bot behind the token
    #[instrument(skip(self))]
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &serde_json::json!({})).await
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn notify(&self, subscriber_id: &str, message: &str) -> Result<()> {
        self.send_message(subscriber_id, message).await
    }
}

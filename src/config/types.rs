//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::errors::{Result, TrackerError};
use crate::tracker::scheduler::SchedulerConfig;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chain access configuration
    #[serde(default)]
    pub ethereum: EthereumConfig,
    /// Telegram bot configuration
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

impl AppConfig {
    /// Check the values the binary cannot run without
    pub fn validate(&self) -> Result<()> {
        if self.telegram.token.trim().is_empty() {
            return Err(TrackerError::Configuration(
                "telegram.token must be provided".to_string(),
            ));
        }

        for (name, value) in [
            ("ethereum.rpc_url", &self.ethereum.rpc_url),
            ("telegram.api_url", &self.telegram.api_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| TrackerError::Configuration(format!("{} is invalid: {}", name, e)))?;
        }

        if self.settings.poll_interval_seconds == 0 {
            return Err(TrackerError::Configuration(
                "settings.poll_interval_seconds must be greater than 0".to_string(),
            ));
        }
        if self.settings.request_timeout_seconds == 0 {
            return Err(TrackerError::Configuration(
                "settings.request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Scheduler settings derived from this configuration
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: Duration::from_secs(self.settings.poll_interval_seconds),
            currency_symbol: self.ethereum.currency_symbol.clone(),
            event_channel_size: self.settings.event_channel_size,
        }
    }
}

/// Ethereum JSON-RPC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthereumConfig {
    /// JSON-RPC endpoint used for `eth_getBalance`
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Network label, for logs only
    #[serde(default = "default_network")]
    pub network: String,
    /// Currency label used in alerts
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

impl Default for EthereumConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            network: default_network(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

fn default_rpc_url() -> String {
    "https://mainnet.base.org".to_string()
}

fn default_network() -> String {
    "base-mainnet".to_string()
}

fn default_currency_symbol() -> String {
    "ETH".to_string()
}

/// Alchemy endpoint for `network` authenticated with `api_key`
pub fn alchemy_rpc_url(network: &str, api_key: &str) -> String {
    format!("https://{}.g.alchemy.com/v2/{}", network, api_key)
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from BotFather
    #[serde(default)]
    pub token: String,
    /// Bot API base URL
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
    /// Long polling timeout for getUpdates, in seconds
    #[serde(default = "default_long_poll_timeout")]
    pub long_poll_timeout_seconds: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_telegram_api_url(),
            long_poll_timeout_seconds: default_long_poll_timeout(),
        }
    }
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_long_poll_timeout() -> u64 {
    30
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Seconds between two balance checks of the same subscription
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Capacity of the tracker event channel
    #[serde(default = "default_event_channel_size")]
    pub event_channel_size: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            poll_interval_seconds: default_poll_interval(),
            request_timeout_seconds: default_request_timeout(),
            event_channel_size: default_event_channel_size(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> u64 {
    600
}

fn default_request_timeout() -> u64 {
    30
}

fn default_event_channel_size() -> usize {
    crate::common::channels::DEFAULT_CHANNEL_SIZE
}

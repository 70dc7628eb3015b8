//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::{alchemy_rpc_url, AppConfig};
use crate::common::errors::{Result, TrackerError};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. `TOKEN` / `APIKEY` legacy variables
/// 2. Environment variables (prefixed with APP_, nested with `__`)
/// 3. Configuration file (TOML format)
/// 4. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| TrackerError::Configuration(e.to_string()))?;

    let mut app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| TrackerError::Configuration(e.to_string()))?;

    apply_legacy_env(&mut app_config);
    Ok(app_config)
}

/// Load configuration from environment variables only
pub fn load_from_env() -> Result<AppConfig> {
    // Try to load from .env file
    dotenvy::dotenv().ok();

    let mut config = AppConfig::default();

    if let Ok(token) = std::env::var("TELEGRAM_TOKEN") {
        config.telegram.token = token;
    }
    if let Ok(api_url) = std::env::var("TELEGRAM_API_URL") {
        config.telegram.api_url = api_url;
    }
    if let Ok(network) = std::env::var("ETH_NETWORK") {
        config.ethereum.network = network;
    }
    if let Ok(rpc_url) = std::env::var("ETH_RPC_URL") {
        config.ethereum.rpc_url = rpc_url;
    }
    if let Some(interval) = std::env::var("POLL_INTERVAL_SECONDS")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        config.settings.poll_interval_seconds = interval;
    }

    apply_legacy_env(&mut config);
    Ok(config)
}

/// `TOKEN` sets the bot token, `APIKEY` points the RPC at Alchemy
fn apply_legacy_env(config: &mut AppConfig) {
    if let Ok(token) = std::env::var("TOKEN") {
        if !token.is_empty() {
            config.telegram.token = token;
        }
    }
    if let Ok(api_key) = std::env::var("APIKEY") {
        if !api_key.is_empty() {
            config.ethereum.rpc_url = alchemy_rpc_url(&config.ethereum.network, &api_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config(Some("does-not-exist.toml")).unwrap();
        assert!(config.settings.poll_interval_seconds > 0);
        assert!(!config.ethereum.rpc_url.is_empty());
    }

    #[test]
    fn test_load_from_env_reads_overrides() {
        std::env::set_var("TELEGRAM_TOKEN", "123:from-env");
        std::env::set_var("ETH_NETWORK", "eth-sepolia");
        std::env::set_var("POLL_INTERVAL_SECONDS", "120");

        let config = load_from_env().unwrap();

        std::env::remove_var("TELEGRAM_TOKEN");
        std::env::remove_var("ETH_NETWORK");
        std::env::remove_var("POLL_INTERVAL_SECONDS");

        if std::env::var("TOKEN").is_err() {
            assert_eq!(config.telegram.token, "123:from-env");
        }
        assert_eq!(config.ethereum.network, "eth-sepolia");
        assert_eq!(config.settings.poll_interval_seconds, 120);
    }
}

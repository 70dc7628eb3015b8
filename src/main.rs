//! BalanceWatch - Main Entry Point
//!
//! Runs the Telegram bot that tracks account balances and alerts when they
//! fall below a subscriber's floor.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use balance_watch::config::load_config;
use balance_watch::{BalanceTracker, EthRpcBalanceSource, TelegramBot, TelegramClient};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides settings.log_level
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Override the seconds between two checks of a subscription
    #[arg(long, env = "POLL_INTERVAL_SECONDS")]
    poll_interval_seconds: Option<u64>,
}

fn init_logging(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    let mut config = load_config(Some(&args.config))?;
    if let Some(interval) = args.poll_interval_seconds {
        config.settings.poll_interval_seconds = interval;
    }

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.settings.log_level);
    init_logging(log_level, args.json_logs)?;

    info!("Starting BalanceWatch");
    info!("Configuration file: {}", args.config);

    config.validate()?;

    let request_timeout = Duration::from_secs(config.settings.request_timeout_seconds);
    let balance_source = Arc::new(EthRpcBalanceSource::with_timeout(
        &config.ethereum.rpc_url,
        request_timeout,
    )?);
    let telegram = Arc::new(TelegramClient::with_timeout(
        &config.telegram.api_url,
        &config.telegram.token,
        request_timeout + Duration::from_secs(config.telegram.long_poll_timeout_seconds),
    )?);

    let tracker = Arc::new(BalanceTracker::new(
        balance_source,
        telegram.clone(),
        config.scheduler_config(),
    ));

    let mut bot = TelegramBot::new(
        Arc::clone(&telegram),
        Arc::clone(&tracker),
        config.ethereum.currency_symbol.clone(),
        config.telegram.long_poll_timeout_seconds,
    );
    match telegram.get_me().await {
        Ok(me) => {
            if let Some(username) = me.username {
                info!("Running as @{}", username);
                bot = bot.with_username(username);
            }
        }
        Err(e) => tracing::warn!("Could not resolve bot identity: {}", e),
    }

    info!(
        network = %config.ethereum.network,
        interval_secs = config.settings.poll_interval_seconds,
        "Application initialized successfully"
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, cleaning up...");
        }
        signal.cancel();
    });

    bot.run(shutdown).await?;
    tracker.shutdown();

    Ok(())
}

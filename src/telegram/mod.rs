//! Telegram module - Bot API client, notifier and command front end

pub mod bot;
pub mod client;
pub mod commands;
pub mod messages;

pub use bot::TelegramBot;
pub use client::TelegramClient;

//! Chat command parsing and replies
//!
//! Text in, tracker call, text out. The subscriber id for every command is
//! the chat id, so alerts go back to the chat that asked for them.

use thiserror::Error;

use super::messages::BotCommand;
use crate::common::errors::TrackerError;
use crate::tracker::service::BalanceTracker;

/// A recognised chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start { address: String, value: String },
    Stop { address: String, value: String },
    List,
    Help,
}

/// Command recognised but unusable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("🔴 Please provide the address and value.")]
    MissingArguments,
}

/// Menu published with setMyCommands
pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new(
            "start",
            "Start the balance track e.g: /start <address> <value>",
        ),
        BotCommand::new("stop", "Stop the balance track e.g: /stop <address> <value>"),
        BotCommand::new("list", "List the balance tracks of this chat"),
    ]
}

/// Parse a message text
///
/// Returns `None` for plain text, unknown commands, and commands addressed
/// to a different bot (`/start@otherbot`).
pub fn parse_command(
    text: &str,
    bot_username: Option<&str>,
) -> Option<Result<Command, CommandError>> {
    let mut words = text.split_whitespace();
    let head = words.next()?.strip_prefix('/')?;

    let name = match head.split_once('@') {
        Some((name, target)) => {
            if let Some(username) = bot_username {
                if !target.eq_ignore_ascii_case(username) {
                    return None;
                }
            }
            name
        }
        None => head,
    };

    let mut two_args = || -> Result<(String, String), CommandError> {
        match (words.next(), words.next()) {
            (Some(address), Some(value)) => Ok((address.to_string(), value.to_string())),
            _ => Err(CommandError::MissingArguments),
        }
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "start" => two_args().map(|(address, value)| Command::Start { address, value }),
        "stop" => two_args().map(|(address, value)| Command::Stop { address, value }),
        "list" => Ok(Command::List),
        "help" => Ok(Command::Help),
        _ => return None,
    };

    Some(command)
}

/// Run `command` for `chat_id` and produce the reply text
pub fn execute(tracker: &BalanceTracker, chat_id: &str, command: Command, currency: &str) -> String {
    match command {
        Command::Start { address, value } => match tracker.start(chat_id, &address, &value) {
            Ok(_) => format!(
                "✅ Starting to follow {address} for the down limit of {value} {currency}\n\
                 🔴 You can stop tracking by saying /stop {address} {value}"
            ),
            Err(e) => error_reply(&e, &address, &value),
        },
        Command::Stop { address, value } => match tracker.stop(chat_id, &address, &value) {
            Ok(_) => format!("Bot unfollowed {}", address),
            Err(e) => error_reply(&e, &address, &value),
        },
        Command::List => list_reply(tracker, chat_id),
        Command::Help => help_reply(),
    }
}

fn list_reply(tracker: &BalanceTracker, chat_id: &str) -> String {
    let mut keys: Vec<String> = tracker
        .list(Some(chat_id))
        .map(|key| key.to_string())
        .collect();

    if keys.is_empty() {
        return "🔴 No active tracking intervals.".to_string();
    }

    keys.sort();
    let mut reply = "📜 Active tracking intervals:\n".to_string();
    for key in keys {
        reply.push_str(&format!("- {}\n", key));
    }
    reply
}

fn help_reply() -> String {
    let mut reply = "Available commands:\n".to_string();
    for command in bot_commands() {
        reply.push_str(&format!("/{} - {}\n", command.command, command.description));
    }
    reply
}

/// User-facing text for a tracker error
pub fn error_reply(error: &TrackerError, address: &str, value: &str) -> String {
    match error {
        TrackerError::InvalidAddress(_) => "🔴 Please enter a valid ethereum address".to_string(),
        TrackerError::InvalidThresholdFormat(_) => {
            "🔴 Please enter a valid format e.g. 1.34".to_string()
        }
        TrackerError::DuplicateSubscription(_) | TrackerError::AlreadyTracking(_) => {
            "🔴 Bot is already working in this chat for this address and value.".to_string()
        }
        TrackerError::NotFound(_) | TrackerError::NotTracking(_) => format!(
            "We do not keep track of such {} and {}. Could not finalize",
            address, value
        ),
        other => format!("🔴 {}", other),
    }
}

//! Telegram Bot API message types

use serde::{Deserialize, Serialize};

/// Envelope every Bot API method answers with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

/// Incoming update from getUpdates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default, rename = "type")]
    pub chat_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub username: Option<String>,
}

/// Entry of the command menu shown by Telegram clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

impl BotCommand {
    pub fn new(command: &str, description: &str) -> Self {
        Self {
            command: command.to_string(),
            description: description.to_string(),
        }
    }
}

/// sendMessage parameters
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest<'a> {
    /// Numeric ids go out as numbers, anything else as a string
    pub chat_id: serde_json::Value,
    pub text: &'a str,
}

impl<'a> SendMessageRequest<'a> {
    pub fn new(chat_id: &str, text: &'a str) -> Self {
        let chat_id = chat_id
            .parse::<i64>()
            .map(serde_json::Value::from)
            .unwrap_or_else(|_| serde_json::Value::String(chat_id.to_string()));
        Self { chat_id, text }
    }
}

/// getUpdates parameters
#[derive(Debug, Clone, Serialize)]
pub struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    pub allowed_updates: Vec<String>,
}

/// setMyCommands parameters
#[derive(Debug, Clone, Serialize)]
pub struct SetMyCommandsRequest<'a> {
    pub commands: &'a [BotCommand],
}

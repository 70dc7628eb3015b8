//! Error types for the application

use thiserror::Error;

/// Result type alias using our TrackerError
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Main error type for tracker operations and its collaborators
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Address is not a valid account address for the target chain
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Threshold text is not `<digits>.<two digits>`
    #[error("Invalid threshold format: {0}")]
    InvalidThresholdFormat(String),

    /// A subscription for this exact key is already registered
    #[error("Already tracking {0}")]
    DuplicateSubscription(String),

    /// A timer is already bound to this key
    #[error("Timer already running for {0}")]
    AlreadyTracking(String),

    /// No subscription is registered for this key
    #[error("No subscription found for {0}")]
    NotFound(String),

    /// No timer is bound to this key
    #[error("No timer running for {0}")]
    NotTracking(String),

    /// Subscription was handed to the scheduler in the Stopped state
    #[error("Subscription {0} is already stopped")]
    SubscriptionStopped(String),

    /// Balance lookup failed at the RPC layer
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Telegram Bot API rejected a request
    #[error("Telegram API error: {0}")]
    Telegram(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`TrackerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller input; nothing was mutated
    Validation,
    /// Conflicts with an existing subscription or timer
    Conflict,
    /// The subscription or timer does not exist
    Lookup,
    /// The balance source failed
    Operational,
    /// The notifier failed
    Delivery,
    /// Configuration and process-level failures
    Infrastructure,
}

impl TrackerError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::InvalidAddress(_) | TrackerError::InvalidThresholdFormat(_) => {
                ErrorKind::Validation
            }
            TrackerError::DuplicateSubscription(_)
            | TrackerError::AlreadyTracking(_)
            | TrackerError::SubscriptionStopped(_) => ErrorKind::Conflict,
            TrackerError::NotFound(_) | TrackerError::NotTracking(_) => ErrorKind::Lookup,
            TrackerError::Rpc(_)
            | TrackerError::HttpRequest(_)
            | TrackerError::JsonParse(_)
            | TrackerError::InvalidResponse(_) => ErrorKind::Operational,
            TrackerError::Telegram(_) => ErrorKind::Delivery,
            TrackerError::Configuration(_) | TrackerError::Internal(_) => {
                ErrorKind::Infrastructure
            }
        }
    }

    /// Whether the caller can fix this by retrying with different input
    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::Conflict | ErrorKind::Lookup
        )
    }
}

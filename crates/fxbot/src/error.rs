//! Error types for the exchange-rate bot

use std::fmt;
use thiserror::Error;

/// Side of a currency pair, used to tell the user which code was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSide {
    From,
    To,
}

impl fmt::Display for PairSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairSide::From => write!(f, "[FROM]"),
            PairSide::To => write!(f, "[TO]"),
        }
    }
}

/// Bot specific errors
#[derive(Debug, Error)]
pub enum BotError {
    /// Text did not match any known command
    #[error("Command not recognized: {0}")]
    CommandNotRecognized(String),

    /// Command was recognized but its arguments could not be parsed
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Currency code absent from the provider's supported set
    #[error("{side} currency not found: {code}")]
    CurrencyNotFound {
        side: PairSide,
        code: String,
    },

    /// Peak detection or trend invoked on an empty series
    #[error("Empty dataset")]
    EmptyDataset,

    /// Conversation step received non-numeric or out-of-range input
    #[error("Invalid numeric input: {0}")]
    InvalidNumericInput(String),

    /// Unsupported frequency or malformed time in an alert schedule
    #[error("Invalid schedule: {0}")]
    ScheduleSpecInvalid(String),

    /// Rate provider returned an error response
    #[error("API error: {0}")]
    ApiError(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Chart rendering failed
    #[error("Chart error: {0}")]
    ChartError(String),

    /// Chat transport failed to deliver a message
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl BotError {
    /// Reply text shown to the chat user for this error
    pub fn user_message(&self) -> String {
        match self {
            BotError::CommandNotRecognized(_) => "Command not found.".to_string(),
            BotError::CurrencyNotFound { side, .. } => {
                format!("{side} Currency is not found, please try again.")
            }
            BotError::EmptyDataset => "Data provided is empty.".to_string(),
            BotError::InvalidCommand(msg)
            | BotError::InvalidNumericInput(msg)
            | BotError::ScheduleSpecInvalid(msg) => msg.clone(),
            _ => "Something went wrong, please try again later.".to_string(),
        }
    }
}

/// Result type alias for bot operations
pub type Result<T> = std::result::Result<T, BotError>;

impl From<anyhow::Error> for BotError {
    fn from(err: anyhow::Error) -> Self {
        BotError::Other(err.to_string())
    }
}

impl From<fxbot_utils::EnvError> for BotError {
    fn from(err: fxbot_utils::EnvError) -> Self {
        BotError::ConfigError(err.to_string())
    }
}

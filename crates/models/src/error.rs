use thiserror::Error;

use crate::MatchStatus;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Invalid status transition for event {event_id}: {from} -> {to}")]
    InvalidTransition {
        event_id: String,
        from: MatchStatus,
        to: MatchStatus,
    },

    #[error("Current minute for event {event_id} cannot go back from {current} to {requested}")]
    MinuteRegression {
        event_id: String,
        current: u32,
        requested: u32,
    },

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: String },

    #[error("Ledger HTTP error: status {status}, body: {body}")]
    LedgerHttp { status: u16, body: String },

    #[error("Ledger GraphQL errors: {0}")]
    Ledger(String),

    #[error("Provider HTTP error: status {status}, body: {body}")]
    ProviderHttp { status: u16, body: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Missing required field in response: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, OracleError>;

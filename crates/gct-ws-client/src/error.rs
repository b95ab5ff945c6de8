/*
[INPUT]:  Error sources (WebSocket transport, serialization, cache storage, server replies)
[OUTPUT]: Structured error types with retry hints
[POS]:    Error handling layer - unified error type for the client crate
[UPDATE]: When adding new error sources or improving error messages
*/

use thiserror::Error;

/// Main error type for the trading bot websocket client
#[derive(Error, Debug)]
pub enum ClientError {
    /// WebSocket transport failure
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Inbound frame could not be turned into an envelope
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Server answered with an error string
    #[error("Server error on {event}: {message}")]
    Server { event: String, message: String },

    /// Local settings cache could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Expected response did not arrive
    #[error("No {event} response after {attempts} attempts")]
    Timeout { event: String, attempts: u32 },
}

impl ClientError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::WebSocket(_) | ClientError::Timeout { .. } | ClientError::Server { .. }
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocket(err.to_string())
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

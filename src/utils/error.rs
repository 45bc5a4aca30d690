//! Error types for the broker and the server.
//!
//! `CommandError` is never fatal: its `Display` text is exactly the payload
//! sent back to the requesting session. `ServerError` covers process-level
//! failures that end up in `main`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Missing payload of type TransportMessage.")]
    MissingEnvelope,

    #[error("Invalid payload.")]
    InvalidPayload,

    #[error("Missing parameter topic.")]
    MissingTopic,

    #[error("Missing parameter message.")]
    MissingMessage,

    #[error("{0} does not exist.")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("invalid frame: {0}")]
    Codec(#[from] serde_json::Error),
}

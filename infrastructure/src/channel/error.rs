//! Error types for the subprocess tool channel

use std::time::Duration;
use thiserror::Error;

/// Result type alias for channel operations
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors that can occur on a subprocess tool channel
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Failed to spawn tool server `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Tool server `{0}` became unusable before the handshake completed")]
    StartFailed(String),

    #[error("Tool server `{server}` did not answer the handshake within {timeout:?}")]
    HandshakeTimeout { server: String, timeout: Duration },

    #[error("Tool call `{tool}` timed out after {after:?}")]
    CallTimeout { tool: String, after: Duration },

    #[error("Channel closed")]
    Closed,

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

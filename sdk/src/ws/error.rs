//! Hub error types.
//!
//! Provides error types for the live bid channel and its transport.

use std::fmt;

/// Hub errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// Connection failed.
    Connection(String),

    /// The hub rejected the protocol handshake.
    Handshake(String),

    /// A record that could not be decoded. The connection stays usable.
    Protocol(String),

    /// Failed to serialize message.
    Serialization(String),

    /// The join invocation completed with an error.
    JoinRejected(String),

    /// No join acknowledgement within the deadline.
    JoinTimeout,

    /// The server stayed silent past the server timeout.
    ServerTimeout,

    /// Connection closed, with the server's reason if any.
    Closed(Option<String>),

    /// Invalid configuration.
    InvalidConfig(String),

    /// Send failed.
    SendFailed(String),
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "connection failed: {}", msg),
            Self::Handshake(msg) => write!(f, "handshake rejected: {}", msg),
            Self::Protocol(msg) => write!(f, "protocol error: {}", msg),
            Self::Serialization(msg) => write!(f, "serialization failed: {}", msg),
            Self::JoinRejected(msg) => write!(f, "join rejected: {}", msg),
            Self::JoinTimeout => write!(f, "join timed out"),
            Self::ServerTimeout => write!(f, "server timed out"),
            Self::Closed(Some(reason)) => write!(f, "connection closed: {}", reason),
            Self::Closed(None) => write!(f, "connection closed"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            Self::SendFailed(msg) => write!(f, "send failed: {}", msg),
        }
    }
}

impl std::error::Error for HubError {}

impl From<tokio_tungstenite::tungstenite::Error> for HubError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

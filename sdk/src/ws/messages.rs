//! Hub wire messages.
//!
//! The hub speaks JSON records terminated by the ASCII record separator
//! (`0x1E`). A single WebSocket frame may carry several records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::HubError;

/// Record terminator.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Hub protocol name sent in the handshake.
pub const PROTOCOL_NAME: &str = "json";

/// Hub protocol version sent in the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

const TYPE_INVOCATION: u8 = 1;
const TYPE_COMPLETION: u8 = 3;
const TYPE_PING: u8 = 6;
const TYPE_CLOSE: u8 = 7;

/// First record sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Protocol name.
    pub protocol: String,
    /// Protocol version.
    pub version: u32,
}

impl Default for HandshakeRequest {
    fn default() -> Self {
        Self {
            protocol: PROTOCOL_NAME.to_string(),
            version: PROTOCOL_VERSION,
        }
    }
}

impl HandshakeRequest {
    /// Encodes the request as a terminated record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String, HubError> {
        let mut text =
            serde_json::to_string(self).map_err(|e| HubError::Serialization(e.to_string()))?;
        text.push(RECORD_SEPARATOR);
        Ok(text)
    }
}

/// Server reply to the handshake. An empty object means success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HandshakeResponse {
    /// Rejection reason.
    #[serde(default)]
    pub error: Option<String>,
}

/// A decoded hub message.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// Method call. Without an invocation id no completion is expected.
    Invocation {
        /// Invocation id.
        invocation_id: Option<String>,
        /// Method or event name.
        target: String,
        /// Positional arguments.
        arguments: Vec<Value>,
    },
    /// Result of an earlier invocation.
    Completion {
        /// Id of the completed invocation.
        invocation_id: String,
        /// Return value.
        result: Option<Value>,
        /// Failure reason.
        error: Option<String>,
    },
    /// Keepalive.
    Ping,
    /// Server-initiated close.
    Close {
        /// Close reason.
        error: Option<String>,
        /// Whether the client may reconnect.
        allow_reconnect: bool,
    },
    /// Any other message type, ignored by the channel.
    Other(u8),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invocation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arguments: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allow_reconnect: Option<bool>,
}

impl HubMessage {
    /// Builds an invocation that expects a completion.
    #[must_use]
    pub fn invocation(
        invocation_id: impl Into<String>,
        target: impl Into<String>,
        arguments: Vec<Value>,
    ) -> Self {
        Self::Invocation {
            invocation_id: Some(invocation_id.into()),
            target: target.into(),
            arguments,
        }
    }

    /// Builds a fire-and-forget invocation, the shape of server events.
    #[must_use]
    pub fn event(target: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self::Invocation {
            invocation_id: None,
            target: target.into(),
            arguments,
        }
    }

    /// Encodes the message as a terminated record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the message type cannot be sent.
    pub fn encode(&self) -> Result<String, HubError> {
        let wire = match self {
            Self::Invocation {
                invocation_id,
                target,
                arguments,
            } => WireMessage {
                kind: TYPE_INVOCATION,
                invocation_id: invocation_id.clone(),
                target: Some(target.clone()),
                arguments: Some(arguments.clone()),
                ..Default::default()
            },
            Self::Completion {
                invocation_id,
                result,
                error,
            } => WireMessage {
                kind: TYPE_COMPLETION,
                invocation_id: Some(invocation_id.clone()),
                result: result.clone(),
                error: error.clone(),
                ..Default::default()
            },
            Self::Ping => WireMessage {
                kind: TYPE_PING,
                ..Default::default()
            },
            Self::Close {
                error,
                allow_reconnect,
            } => WireMessage {
                kind: TYPE_CLOSE,
                error: error.clone(),
                allow_reconnect: Some(*allow_reconnect),
                ..Default::default()
            },
            Self::Other(kind) => {
                return Err(HubError::Serialization(format!(
                    "cannot encode message type {}",
                    kind
                )))
            }
        };

        let mut text =
            serde_json::to_string(&wire).map_err(|e| HubError::Serialization(e.to_string()))?;
        text.push(RECORD_SEPARATOR);
        Ok(text)
    }

    /// Decodes a single record without its terminator.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is not a valid hub message.
    pub fn decode(record: &str) -> Result<Self, HubError> {
        let wire: WireMessage =
            serde_json::from_str(record).map_err(|e| HubError::Protocol(e.to_string()))?;

        match wire.kind {
            TYPE_INVOCATION => {
                let target = wire
                    .target
                    .ok_or_else(|| HubError::Protocol("invocation without target".to_string()))?;
                Ok(Self::Invocation {
                    invocation_id: wire.invocation_id,
                    target,
                    arguments: wire.arguments.unwrap_or_default(),
                })
            }
            TYPE_COMPLETION => {
                let invocation_id = wire.invocation_id.ok_or_else(|| {
                    HubError::Protocol("completion without invocation id".to_string())
                })?;
                Ok(Self::Completion {
                    invocation_id,
                    result: wire.result,
                    error: wire.error,
                })
            }
            TYPE_PING => Ok(Self::Ping),
            TYPE_CLOSE => Ok(Self::Close {
                error: wire.error,
                allow_reconnect: wire.allow_reconnect.unwrap_or(false),
            }),
            other => Ok(Self::Other(other)),
        }
    }

    /// Splits a frame into records and decodes each one.
    ///
    /// Empty records are skipped; a bad record does not affect its neighbours.
    #[must_use]
    pub fn decode_frame(frame: &str) -> Vec<Result<Self, HubError>> {
        frame
            .split(RECORD_SEPARATOR)
            .map(str::trim)
            .filter(|record| !record.is_empty())
            .map(Self::decode)
            .collect()
    }
}

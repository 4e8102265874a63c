//! Hub transport.
//!
//! [`HubConnector`] opens a handshaken connection to the hub and
//! [`HubConnection`] moves [`HubMessage`]s over it. The channel only talks
//! to these traits, so tests can script a hub without a socket.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::config::HubConfig;
use super::error::HubError;
use super::messages::{HandshakeRequest, HandshakeResponse, HubMessage, RECORD_SEPARATOR};
use crate::auth::SharedCredentials;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens connections to the hub.
#[async_trait]
pub trait HubConnector: Send + Sync + fmt::Debug {
    /// Connects and completes the protocol handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or handshake fails.
    async fn connect(&self) -> Result<Box<dyn HubConnection>, HubError>;
}

/// Shared connector handle.
pub type SharedHubConnector = Arc<dyn HubConnector>;

/// An open, handshaken hub connection.
#[async_trait]
pub trait HubConnection: Send + fmt::Debug {
    /// Sends one message.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is gone.
    async fn send(&mut self, message: &HubMessage) -> Result<(), HubError>;

    /// Receives the next message. `None` once the connection has ended.
    ///
    /// Must be cancel safe: dropping the future never loses a message.
    async fn recv(&mut self) -> Option<Result<HubMessage, HubError>>;

    /// Closes the connection. Best effort.
    async fn close(&mut self);
}

/// WebSocket connector for the hub.
#[derive(Debug, Clone)]
pub struct WsHubConnector {
    config: HubConfig,
    credentials: Option<SharedCredentials>,
}

impl WsHubConnector {
    /// Creates a new connector.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: HubConfig) -> Result<Self, HubError> {
        config.validate()?;
        Ok(Self {
            config,
            credentials: None,
        })
    }

    /// Attaches credentials; the token is re-read on every connect.
    #[must_use]
    pub fn with_credentials(mut self, credentials: SharedCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Returns the hub configuration.
    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    async fn handshake(
        &self,
        stream: &mut WsStream,
    ) -> Result<VecDeque<Result<HubMessage, HubError>>, HubError> {
        let request = HandshakeRequest::default().encode()?;
        stream
            .send(Message::Text(request.into()))
            .await
            .map_err(|e| HubError::Handshake(e.to_string()))?;

        let frame = loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => break text,
                Some(Ok(Message::Close(_))) | None => {
                    return Err(HubError::Handshake(
                        "connection closed during handshake".to_string(),
                    ))
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(HubError::Handshake(e.to_string())),
            }
        };

        let (reply, rest) = frame
            .as_str()
            .split_once(RECORD_SEPARATOR)
            .ok_or_else(|| HubError::Handshake("unterminated handshake reply".to_string()))?;

        let response: HandshakeResponse =
            serde_json::from_str(reply).map_err(|e| HubError::Handshake(e.to_string()))?;
        if let Some(error) = response.error {
            return Err(HubError::Handshake(error));
        }

        // Records may trail the handshake reply in the same frame.
        Ok(HubMessage::decode_frame(rest).into_iter().collect())
    }
}

#[async_trait]
impl HubConnector for WsHubConnector {
    async fn connect(&self) -> Result<Box<dyn HubConnection>, HubError> {
        let token = self
            .credentials
            .as_ref()
            .and_then(|credentials| credentials.access_token());
        let url = self.config.connection_url(token.as_deref());

        let (mut stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| HubError::Connection(e.to_string()))?;

        let pending = self.handshake(&mut stream).await?;
        debug!(url = %self.config.url, "hub handshake complete");

        Ok(Box::new(WsHubConnection { stream, pending }))
    }
}

/// WebSocket hub connection.
pub struct WsHubConnection {
    stream: WsStream,
    pending: VecDeque<Result<HubMessage, HubError>>,
}

impl fmt::Debug for WsHubConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsHubConnection")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl HubConnection for WsHubConnection {
    async fn send(&mut self, message: &HubMessage) -> Result<(), HubError> {
        let text = message.encode()?;
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| HubError::SendFailed(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<HubMessage, HubError>> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Some(message);
            }

            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    self.pending.extend(HubMessage::decode_frame(text.as_str()));
                }
                Some(Ok(Message::Binary(_))) => {
                    warn!("binary frame ignored by json hub protocol");
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "hub closed the socket");
                    return None;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Some(Err(e.into())),
                None => return None,
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "socket close failed");
        }
    }
}

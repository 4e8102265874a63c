//! Live bid channel over the auction hub.
//!
//! This module connects to the auction hub over WebSocket, joins one
//! auction's room and delivers [`BidEvent`](crate::types::BidEvent)s and the
//! auction-ended signal to caller-supplied handlers.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gavel_sdk::types::AuctionId;
//! use gavel_sdk::ws::{ChannelHandlers, HubConfig, LiveBidChannel, WsHubConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HubConfig::new("wss://gavel.example/auctionHub");
//!     let connector = Arc::new(WsHubConnector::new(config.clone())?);
//!     let channel = LiveBidChannel::new(connector, config);
//!
//!     let handlers = ChannelHandlers::new(
//!         |bid| println!("new bid: {}", bid.amount),
//!         || println!("auction ended"),
//!     );
//!     let session = channel.open(AuctionId::new("42")?, handlers);
//!     session.joined().await.ok();
//!
//!     tokio::signal::ctrl_c().await?;
//!     channel.close(session).await;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod messages;
pub mod metrics;

#[cfg(test)]
pub(crate) mod fake;

pub use channel::{ChannelHandlers, ChannelSession, ConnectionState, LiveBidChannel};
pub use client::{HubConnection, HubConnector, SharedHubConnector, WsHubConnector};
pub use config::HubConfig;
pub use error::HubError;
pub use messages::HubMessage;
pub use metrics::ChannelMetrics;

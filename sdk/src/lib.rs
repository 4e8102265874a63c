//! Gavel SDK - Rust client library for the Gavel auction marketplace.
//!
//! This crate lists auctions, loads auction detail, places bids and keeps a
//! local auction snapshot in sync with the live bid hub.
//!
//! # Modules
//!
//! - [`client`]: REST client ([`GavelClient`])
//! - [`ws`]: live bid channel ([`LiveBidChannel`], [`ChannelSession`])
//! - [`store`]: max-wins auction snapshot store ([`AuctionSnapshotStore`])
//! - [`view`]: glue binding one store to one session ([`AuctionView`])
//! - [`form`]: client-side bid validation
//! - [`auth`]: credential providers
//! - [`format`]: currency and time display
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gavel_sdk::{AuctionId, AuctionView, GavelClient, HubConfig, LiveBidChannel, WsHubConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(GavelClient::with_base_url("http://localhost:5000/api")?);
//!     let hub = HubConfig::new("http://localhost:5000/auctionHub");
//!     let channel = LiveBidChannel::new(Arc::new(WsHubConnector::new(hub.clone())?), hub);
//!
//!     let mut view = AuctionView::new(client, channel);
//!     let store = view.bind(AuctionId::new("42")?).await;
//!
//!     let mut updates = store.subscribe();
//!     while updates.changed().await.is_ok() {
//!         if let Some(snapshot) = updates.borrow().as_ref() {
//!             println!("{}: {}", snapshot.name, snapshot.current_price);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod form;
pub mod format;
pub mod store;
pub mod types;
pub mod view;
pub mod ws;

pub use auth::{CredentialProvider, SessionCredentials, SharedCredentials, StaticToken};
pub use client::{ClientConfig, ClientError, GavelClient};
pub use error::SdkError;
pub use form::{BidForm, ValidationError};
pub use store::{
    ApplyOutcome, AuctionSnapshotStore, AuctionSource, IgnoreReason, LoadError,
    SharedAuctionSource,
};
pub use types::{
    Amount, AuctionId, AuctionSnapshot, AuctionStatus, AuctionSummary, AuthSession, BidEvent,
    BidRequest, LoginRequest, MalformedEventError, RegisterRequest,
};
pub use view::{AuctionView, LoadPhase};
pub use ws::{
    ChannelHandlers, ChannelMetrics, ChannelSession, ConnectionState, HubConfig, HubError,
    LiveBidChannel, WsHubConnector,
};

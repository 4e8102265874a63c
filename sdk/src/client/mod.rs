//! HTTP client for the Gavel REST API.
//!
//! This module provides a type-safe HTTP client for listing auctions,
//! fetching auction detail, placing bids and managing accounts.
//!
//! # Example
//!
//! ```rust,ignore
//! use gavel_sdk::client::GavelClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GavelClient::with_base_url("http://localhost:5000/api")?;
//!
//!     for auction in client.list_auctions().await? {
//!         println!("{}: {}", auction.name, auction.current_price);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod http;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http::GavelClient;

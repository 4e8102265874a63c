//! Core types for the Gavel SDK.
//!
//! This module provides the value types exchanged with the marketplace
//! backend and the live bid channel.

pub mod account;
pub mod auction;
pub mod bid;
pub mod primitives;

pub use account::{AuthSession, LoginRequest, RegisterRequest};
pub use auction::{AuctionResource, AuctionSnapshot, AuctionStatus, AuctionSummary};
pub use bid::{BidEvent, BidRequest, MalformedEventError};
pub use primitives::{Amount, AuctionId};

//! SDK error types.
//!
//! Provides error types for value construction and parsing.

/// SDK errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    /// Invalid monetary amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid auction identifier.
    #[error("invalid auction id: {0}")]
    InvalidAuctionId(String),

    /// Invalid timestamp.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,
}

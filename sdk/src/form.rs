//! Bid form validation.
//!
//! Checks a bid against the current price before it is submitted. The
//! backend remains the authority; these checks only catch obvious mistakes.

use crate::client::http::BID_REJECTED_MESSAGE;
use crate::client::ClientError;
use crate::types::{Amount, AuctionId, BidRequest};

/// Message shown after an accepted bid.
pub const BID_PLACED_MESSAGE: &str = "Bid placed successfully!";

/// Client-side bid validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No bidder name given.
    #[error("Please enter your name.")]
    MissingBidderName,

    /// The amount is unparseable or not above the current price.
    #[error("The bid amount must be greater than the current price.")]
    BidNotAboveCurrent,
}

/// Lowest amount worth suggesting: one unit above the current price.
#[must_use]
pub fn suggested_minimum(current_price: Amount) -> Amount {
    current_price
        .checked_add(Amount::from(1u64))
        .unwrap_or(current_price)
}

/// User-facing message for a failed submission.
#[must_use]
pub fn bid_failure_message(error: &ClientError) -> String {
    match error {
        ClientError::Validation(message) => message.clone(),
        _ => BID_REJECTED_MESSAGE.to_string(),
    }
}

/// Raw bid form input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidForm {
    /// Auction being bid on.
    pub auction_id: AuctionId,
    /// Bidder name as typed.
    pub bidder_name: String,
    /// Amount as typed.
    pub amount: String,
}

impl BidForm {
    /// Creates an empty form for an auction.
    #[must_use]
    pub fn new(auction_id: AuctionId) -> Self {
        Self {
            auction_id,
            bidder_name: String::new(),
            amount: String::new(),
        }
    }

    /// Sets the bidder name.
    #[must_use]
    pub fn with_bidder_name(mut self, name: impl Into<String>) -> Self {
        self.bidder_name = name.into();
        self
    }

    /// Sets the amount.
    #[must_use]
    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = amount.into();
        self
    }

    /// Validates the form against the displayed price.
    ///
    /// # Errors
    ///
    /// Returns the first failing check, name before amount.
    pub fn validate(&self, current_price: Amount) -> Result<BidRequest, ValidationError> {
        let name = self.bidder_name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingBidderName);
        }

        let amount: Amount = self
            .amount
            .parse()
            .map_err(|_| ValidationError::BidNotAboveCurrent)?;
        if amount <= current_price {
            return Err(ValidationError::BidNotAboveCurrent);
        }

        Ok(BidRequest {
            auction_item_id: self.auction_id.clone(),
            amount,
            bidder_name: Some(name.to_string()),
        })
    }
}

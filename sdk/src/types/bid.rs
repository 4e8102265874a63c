//! Bid types for the Gavel SDK.
//!
//! Provides the pushed bid event and the bid submission body.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::primitives::{Amount, AuctionId};

/// A bid pushed by the live channel.
///
/// The transport gives no uniqueness or ordering guarantee; consumers merge
/// events max-wins on `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidEvent {
    /// Auction the bid belongs to.
    pub auction_id: AuctionId,

    /// Bid amount.
    pub amount: Amount,

    /// Bidder display name, when provided.
    pub bidder_name: Option<String>,
}

/// A push payload that could not be turned into a [`BidEvent`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed bid event: {reason}")]
pub struct MalformedEventError {
    /// Why the payload was rejected.
    pub reason: String,
}

impl MalformedEventError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BidPayload {
    #[serde(default, alias = "auctionItemId")]
    auction_id: Option<AuctionId>,
    amount: Option<Amount>,
    #[serde(default)]
    bidder_name: Option<String>,
}

impl BidEvent {
    /// Creates a new bid event.
    #[must_use]
    pub fn new(auction_id: AuctionId, amount: Amount) -> Self {
        Self {
            auction_id,
            amount,
            bidder_name: None,
        }
    }

    /// Sets the bidder name.
    #[must_use]
    pub fn with_bidder(mut self, name: impl Into<String>) -> Self {
        self.bidder_name = Some(name.into());
        self
    }

    /// Parses a raw push payload.
    ///
    /// Payloads that omit the auction id are attributed to `bound`, the
    /// auction the receiving session joined.
    ///
    /// # Errors
    ///
    /// Returns `MalformedEventError` if the payload is not an object, the
    /// amount is missing, non-numeric or negative, or the id is empty.
    pub fn from_payload(payload: &Value, bound: &AuctionId) -> Result<Self, MalformedEventError> {
        if !payload.is_object() {
            return Err(MalformedEventError::new("payload is not an object"));
        }

        let parsed = BidPayload::deserialize(payload)
            .map_err(|e| MalformedEventError::new(e.to_string()))?;

        let amount = parsed
            .amount
            .ok_or_else(|| MalformedEventError::new("missing amount"))?;

        Ok(Self {
            auction_id: parsed.auction_id.unwrap_or_else(|| bound.clone()),
            amount,
            bidder_name: parsed.bidder_name.filter(|name| !name.trim().is_empty()),
        })
    }
}

/// Body of `POST /Bid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidRequest {
    /// Auction being bid on.
    pub auction_item_id: AuctionId,

    /// Offered amount.
    pub amount: Amount,

    /// Bidder display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidder_name: Option<String>,
}

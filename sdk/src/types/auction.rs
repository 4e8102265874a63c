//! Auction types for the Gavel SDK.
//!
//! Provides the auction snapshot held by the store and the wire resources it
//! is built from.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use super::primitives::{Amount, AuctionId};

/// Wire code the backend uses for an ended auction.
pub const ENDED_STATUS_CODE: i64 = 2;

/// Auction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    /// No fetch has resolved yet.
    #[default]
    Pending,
    /// Accepting bids.
    Active,
    /// Closed for bidding.
    Ended,
}

impl AuctionStatus {
    /// Maps a backend status code.
    ///
    /// Anything other than the ended code is treated as active.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        if code == ENDED_STATUS_CODE {
            Self::Ended
        } else {
            Self::Active
        }
    }

    /// Returns true if bidding is closed.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// Observable state of one auction at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSnapshot {
    /// Auction identifier.
    pub id: AuctionId,

    /// Display name.
    pub name: String,

    /// Free-form description.
    pub description: String,

    /// Highest accepted price so far.
    pub current_price: Amount,

    /// When bidding closes.
    pub end_time: DateTime<Utc>,

    /// Lifecycle status.
    pub status: AuctionStatus,
}

impl AuctionSnapshot {
    /// Returns true if bidding is still open according to the held status.
    #[must_use]
    pub const fn accepts_bids(&self) -> bool {
        matches!(self.status, AuctionStatus::Active)
    }
}

/// Auction detail as returned by `GET /AuctionItem/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionResource {
    /// Identifier, when the backend echoes it.
    #[serde(default)]
    pub id: Option<AuctionId>,

    /// Display name.
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,

    /// Current price.
    pub current_price: Amount,

    /// End of bidding.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub end_time: DateTime<Utc>,

    /// Raw status code.
    #[serde(default)]
    pub status: Option<i64>,
}

impl AuctionResource {
    /// Converts the resource into a snapshot for the requested auction.
    ///
    /// The requested identifier wins over whatever the body echoes so a
    /// snapshot can never be filed under a different auction.
    #[must_use]
    pub fn into_snapshot(self, requested: &AuctionId) -> AuctionSnapshot {
        if let Some(ref echoed) = self.id {
            if echoed != requested {
                tracing::warn!(
                    requested = %requested,
                    echoed = %echoed,
                    "auction body echoes a different id"
                );
            }
        }

        AuctionSnapshot {
            id: requested.clone(),
            name: self.name,
            description: self.description.unwrap_or_default(),
            current_price: self.current_price,
            end_time: self.end_time,
            status: self
                .status
                .map_or(AuctionStatus::Active, AuctionStatus::from_code),
        }
    }
}

/// One entry of the auction listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSummary {
    /// Auction identifier.
    pub id: AuctionId,

    /// Display name.
    pub name: String,

    /// Current price.
    pub current_price: Amount,

    /// End of bidding, when listed.
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub end_time: Option<DateTime<Utc>>,

    /// Raw status code, when listed.
    #[serde(default)]
    pub status: Option<i64>,
}

impl AuctionSummary {
    /// Returns the mapped status.
    #[must_use]
    pub fn status(&self) -> AuctionStatus {
        self.status
            .map_or(AuctionStatus::Active, AuctionStatus::from_code)
    }
}

/// Parses an ISO-8601 timestamp.
///
/// Offsets are honoured; timestamps without one are taken as UTC, which is
/// how the backend serializes them.
///
/// # Errors
///
/// Returns an error message if the text is not a recognised timestamp.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("{}: {}", text, e))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text).map_err(de::Error::custom)
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(text) => parse_timestamp(&text).map(Some).map_err(de::Error::custom),
        None => Ok(None),
    }
}

//! Primitive types for the Gavel SDK.
//!
//! Provides type-safe wrappers for auction identifiers and monetary amounts.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SdkError;

/// Opaque auction identifier.
///
/// Stable for the lifetime of an auction and never empty. The backend may
/// hand out numeric or textual identifiers; both are carried as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuctionId(String);

impl AuctionId {
    /// Creates a new auction identifier.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidAuctionId` if the identifier is empty or
    /// only whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, SdkError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SdkError::InvalidAuctionId(
                "auction id cannot be empty".to_string(),
            ));
        }
        if trimmed.len() == value.len() {
            Ok(Self(value))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AuctionId {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for AuctionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AuctionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        let raw = match RawId::deserialize(deserializer)? {
            RawId::Text(text) => text,
            RawId::Unsigned(n) => n.to_string(),
            RawId::Signed(n) => n.to_string(),
        };
        Self::new(raw).map_err(de::Error::custom)
    }
}

/// A non-negative monetary amount in the marketplace currency.
///
/// Backed by a decimal so bids like `10.10` compare exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// Creates a new amount.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidAmount` if the value is negative.
    pub fn new(value: Decimal) -> Result<Self, SdkError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(SdkError::InvalidAmount(format!(
                "amount cannot be negative: {}",
                value
            )));
        }
        Ok(Self(value.normalize()))
    }

    /// Creates an amount from a whole number of currency units.
    #[must_use]
    pub fn from_units(units: u64) -> Self {
        Self(Decimal::from(units))
    }

    /// Returns zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Returns the raw decimal value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Overflow` if the result overflows.
    pub fn checked_add(self, other: Self) -> Result<Self, SdkError> {
        self.0
            .checked_add(other.0)
            .map(|v| Self(v.normalize()))
            .ok_or(SdkError::Overflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| SdkError::InvalidAmount(format!("{}: {}", s, e)))?;
        Self::new(value)
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Self::from_units(units)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auction_id_new() {
        let id = AuctionId::new("42").expect("id");
        assert_eq!(id.as_str(), "42");
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_auction_id_trims_whitespace() {
        let id = AuctionId::new("  abc ").expect("id");
        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn test_auction_id_rejects_empty() {
        assert!(AuctionId::new("").is_err());
        assert!(AuctionId::new("   ").is_err());
    }

    #[test]
    fn test_auction_id_deserialize_number_and_text() {
        let id: AuctionId = serde_json::from_str("17").expect("numeric id");
        assert_eq!(id.as_str(), "17");

        let id: AuctionId =
            serde_json::from_str("\"3f2c9a40-0000-4000-8000-000000000001\"").expect("text id");
        assert_eq!(id.as_str(), "3f2c9a40-0000-4000-8000-000000000001");

        assert!(serde_json::from_str::<AuctionId>("\"\"").is_err());
    }

    #[test]
    fn test_amount_rejects_negative() {
        assert!(Amount::new(Decimal::new(-1, 0)).is_err());
        assert!(Amount::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_amount_ordering_is_exact() {
        let a: Amount = "10.10".parse().expect("amount");
        let b: Amount = "10.1".parse().expect("amount");
        assert_eq!(a, b);
        assert!(Amount::from(11) > a);
    }

    #[test]
    fn test_amount_from_str_invalid() {
        assert!("abc".parse::<Amount>().is_err());
        assert!("-5".parse::<Amount>().is_err());
        assert!("".parse::<Amount>().is_err());
    }

    #[test]
    fn test_amount_json_number() {
        let amount: Amount = serde_json::from_str("150.25").expect("deserialize");
        assert_eq!(amount, "150.25".parse().expect("amount"));

        let json = serde_json::to_string(&amount).expect("serialize");
        assert_eq!(json, "150.25");

        assert!(serde_json::from_str::<Amount>("-3").is_err());
    }

    #[test]
    fn test_amount_json_integer_and_text() {
        let amount: Amount = serde_json::from_str("1250").expect("integer");
        assert_eq!(amount, Amount::from(1250u64));

        let amount: Amount = serde_json::from_str("\"99.5\"").expect("text");
        assert_eq!(amount.to_string(), "99.5");
    }

    #[test]
    fn test_amount_checked_add() {
        let sum = Amount::from(100).checked_add(Amount::from(1)).expect("sum");
        assert_eq!(sum, Amount::from(101));
    }
}

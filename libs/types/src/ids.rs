//! Identifier types for exchange entities
//!
//! Order ids are content-derived: a SHA-256 digest over the fields that
//! define the order at creation time, so any node can recompute them
//! without a central sequence generator.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::order::Side;

/// Errors produced while parsing identifiers from text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("invalid order id hex: {0}")]
    InvalidHex(String),

    #[error("market symbol must not be empty")]
    EmptyMarket,
}

/// Unique identifier for an order
///
/// A 32-byte SHA-256 digest, displayed and serialized as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId([u8; 32]);

/// Fields an [`OrderId`] is derived from
#[derive(Debug, Clone, Copy)]
pub struct OrderIdSeed<'a> {
    pub owner: &'a AccountId,
    pub currency: &'a str,
    pub side: Side,
    pub instrument: Instrument,
    pub quantity: u64,
    pub timestamp: i64,
}

impl OrderId {
    /// Derive the id from the order's creation fields.
    ///
    /// Strings are length-prefixed and integers big-endian so that two
    /// distinct seeds never share an encoding.
    pub fn derive(seed: &OrderIdSeed<'_>) -> Self {
        let mut hasher = Sha256::new();
        write_str(&mut hasher, seed.owner.as_str());
        write_str(&mut hasher, seed.currency);
        hasher.update([seed.side.is_bid() as u8]);
        hasher.update(seed.instrument.collection.to_be_bytes());
        hasher.update(seed.instrument.token_id.to_be_bytes());
        hasher.update(seed.quantity.to_be_bytes());
        hasher.update(seed.timestamp.to_be_bytes());
        Self(hasher.finalize().into())
    }

    /// Create from raw digest bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a hex-encoded id as produced by `Display`
    pub fn from_hex(s: &str) -> Result<Self, IdError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| IdError::InvalidHex(s.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

fn write_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_be_bytes());
    hasher.update(s.as_bytes());
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for OrderId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for OrderId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Owner of an order (wallet address)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Market identifier (e.g. "fra")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarketId(String);

impl MarketId {
    /// Create a new MarketId
    ///
    /// # Panics
    /// Panics if the symbol is empty
    pub fn new(symbol: impl Into<String>) -> Self {
        let s = symbol.into();
        assert!(!s.is_empty(), "MarketId must not be empty");
        Self(s)
    }

    /// Try to create a MarketId, rejecting empty symbols
    pub fn try_new(symbol: impl Into<String>) -> Result<Self, IdError> {
        let s = symbol.into();
        if s.is_empty() {
            return Err(IdError::EmptyMarket);
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MarketId {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::try_new(s)
    }
}

impl From<MarketId> for String {
    fn from(m: MarketId) -> Self {
        m.0
    }
}

/// A single tradable item: one token of one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Instrument {
    pub collection: u64,
    pub token_id: u64,
}

impl Instrument {
    pub fn new(collection: u64, token_id: u64) -> Self {
        Self { collection, token_id }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.collection, self.token_id)
    }
}

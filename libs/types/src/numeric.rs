//! Fixed-point decimal prices
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Quantities are whole item counts and stay plain `u64`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("price must be positive, got {0}")]
    NonPositive(Decimal),

    #[error("unparseable price: {0}")]
    Parse(String),
}

/// A strictly positive price
///
/// Totally ordered and hashable so it can key a price-level map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub fn try_new(value: Decimal) -> Result<Self, PriceError> {
        if value <= Decimal::ZERO {
            return Err(PriceError::NonPositive(value));
        }
        // Normalized so 10000 and 10000.00 share a level
        Ok(Self(value.normalize()))
    }

    /// # Panics
    /// Panics if `value` is zero
    pub fn from_u64(value: u64) -> Self {
        Self::try_new(Decimal::from(value)).expect("price must be positive")
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|_| PriceError::Parse(s.to_string()))?;
        Self::try_new(value)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Price> for Decimal {
    fn from(p: Price) -> Self {
        p.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

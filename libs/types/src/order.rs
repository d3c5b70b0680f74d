//! Order lifecycle types

use crate::ids::{AccountId, Instrument, OrderId, OrderIdSeed};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order
    Bid,
    /// Sell order
    Ask,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    pub fn is_bid(&self) -> bool {
        matches!(self, Side::Bid)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => f.write_str("BID"),
            Side::Ask => f.write_str("ASK"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Filled,
    Canceled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

/// One side's intent to trade a quantity of an instrument
///
/// Identity fields are fixed at creation; only `quantity` and `status`
/// change afterwards, and `quantity` never increases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner: AccountId,
    pub currency: String,
    pub side: Side,
    pub instrument: Instrument,
    pub quantity: u64,
    pub timestamp: i64, // Unix nanos
    pub status: OrderStatus,
}

impl Order {
    /// Create a new pending order stamped with the current time
    pub fn new(
        owner: AccountId,
        currency: impl Into<String>,
        side: Side,
        instrument: Instrument,
        quantity: u64,
    ) -> Self {
        Self::with_timestamp(owner, currency, side, instrument, quantity, now_nanos())
    }

    /// Create a new pending order with an explicit creation timestamp
    pub fn with_timestamp(
        owner: AccountId,
        currency: impl Into<String>,
        side: Side,
        instrument: Instrument,
        quantity: u64,
        timestamp: i64,
    ) -> Self {
        let currency = currency.into();
        let id = OrderId::derive(&OrderIdSeed {
            owner: &owner,
            currency: &currency,
            side,
            instrument,
            quantity,
            timestamp,
        });

        Self {
            id,
            owner,
            currency,
            side,
            instrument,
            quantity,
            timestamp,
            status: OrderStatus::Pending,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.quantity == 0
    }

    pub fn is_bid(&self) -> bool {
        self.side.is_bid()
    }

    /// Decrease the open quantity by `amount`
    ///
    /// # Panics
    /// Panics if `amount` exceeds the open quantity
    pub fn reduce(&mut self, amount: u64) {
        assert!(amount <= self.quantity, "Fill would exceed order quantity");
        self.quantity -= amount;
        if self.quantity == 0 {
            self.status = OrderStatus::Filled;
        }
    }

    /// Mark the order canceled
    ///
    /// # Panics
    /// Panics if the order is already filled or canceled
    pub fn cancel(&mut self) {
        assert!(!self.status.is_terminal(), "Cannot cancel terminal order");
        self.status = OrderStatus::Canceled;
    }
}

/// Current wall-clock time in Unix nanoseconds
pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

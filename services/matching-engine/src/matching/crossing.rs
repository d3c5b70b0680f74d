//! Crossing detection logic
//!
//! Determines which resting price levels an incoming limit order may
//! trade against.

use nft_types::numeric::Price;
use nft_types::order::Side;
use serde::{Deserialize, Serialize};

/// Which opposite-side levels a limit order crosses on arrival
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingPolicy {
    /// Only the opposite level at the identical price
    #[default]
    ExactPrice,
    /// Every opposite level at an equal or better price, best first
    PriceThrough,
}

/// Check if a bid and ask can match at given prices
pub fn can_match(bid_price: Price, ask_price: Price) -> bool {
    bid_price >= ask_price
}

/// Check if an incoming order at `incoming_price` crosses a resting
/// order at `resting_price`
pub fn incoming_can_match(incoming_side: Side, incoming_price: Price, resting_price: Price) -> bool {
    match incoming_side {
        Side::Bid => can_match(incoming_price, resting_price),
        Side::Ask => can_match(resting_price, incoming_price),
    }
}

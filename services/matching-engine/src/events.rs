//! Event structures for matching engine
//!
//! Published to feed subscribers after every successful placement or
//! cancellation.

use nft_types::ids::MarketId;
use nft_types::numeric::Price;
use nft_types::order::Order;
use nft_types::trade::Match;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// An order (or its unfilled remainder) was booked
    OrderRested {
        market: MarketId,
        price: Price,
        order: Order,
    },
    /// Two orders traded
    Matched { market: MarketId, trade: Match },
    /// A resting order was removed by its owner
    OrderCanceled { market: MarketId, order: Order },
}

impl EngineEvent {
    pub fn market(&self) -> &MarketId {
        match self {
            EngineEvent::OrderRested { market, .. }
            | EngineEvent::Matched { market, .. }
            | EngineEvent::OrderCanceled { market, .. } => market,
        }
    }

    /// Short label used in logs
    pub fn event_type_label(&self) -> &'static str {
        match self {
            EngineEvent::OrderRested { .. } => "order_rested",
            EngineEvent::Matched { .. } => "matched",
            EngineEvent::OrderCanceled { .. } => "order_canceled",
        }
    }
}

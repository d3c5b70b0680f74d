//! Match records emitted by the matching engine

use crate::ids::{AccountId, Instrument, OrderId};
use crate::numeric::Price;
use crate::order::{Order, OrderStatus, Side};
use serde::{Deserialize, Serialize};

/// State of one participant immediately after a fill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedOrder {
    pub order_id: OrderId,
    pub owner: AccountId,
    /// Open quantity left after this fill
    pub remaining: u64,
    pub status: OrderStatus,
}

impl MatchedOrder {
    pub fn is_filled(&self) -> bool {
        self.remaining == 0
    }
}

impl From<&Order> for MatchedOrder {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            owner: order.owner.clone(),
            remaining: order.quantity,
            status: order.status,
        }
    }
}

/// One pairing of a bid and an ask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Per-book monotonic sequence
    pub sequence: u64,
    pub instrument: Instrument,
    /// Price of the resting limit the match executed at
    pub price: Price,
    pub size_filled: u64,
    pub timestamp: i64, // Unix nanos
    pub bid: MatchedOrder,
    pub ask: MatchedOrder,
}

impl Match {
    /// The participant on the given side
    pub fn order(&self, side: Side) -> &MatchedOrder {
        if side.is_bid() {
            &self.bid
        } else {
            &self.ask
        }
    }
}

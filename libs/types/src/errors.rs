//! Error types for the matching engine
//!
//! Every engine failure is returned to the caller as an `EngineError`;
//! none is fatal to the process.

use thiserror::Error;

use crate::ids::{Instrument, MarketId, OrderId};
use crate::numeric::PriceError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("market not found: {market}")]
    MarketNotFound { market: MarketId },

    #[error("not enough volume [quantity: {available}] for market order [quantity: {requested}]")]
    InsufficientLiquidity { requested: u64, available: u64 },

    #[error("instrument mismatch: resting {resting}, incoming {incoming}")]
    MismatchedInstrument { resting: Instrument, incoming: Instrument },

    #[error("order not found: {order_id}")]
    OrderNotFound { order_id: OrderId },

    #[error("order already resting: {order_id}")]
    DuplicateOrder { order_id: OrderId },

    #[error("invalid price: {0}")]
    InvalidPrice(#[from] PriceError),
}

impl EngineError {
    /// Whether the error reflects a caller bug rather than a market condition
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, EngineError::MismatchedInstrument { .. })
    }
}

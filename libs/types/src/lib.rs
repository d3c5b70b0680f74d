//! Types library for the NFT order-matching exchange
//!
//! Plain data records exchanged between the matching engine and the
//! request layer that drives it.
//!
//! # Modules
//! - `ids`: Identifiers (OrderId, AccountId, MarketId, Instrument)
//! - `numeric`: Positive decimal prices
//! - `order`: Order lifecycle types
//! - `trade`: Match records
//! - `errors`: Error taxonomy

pub mod ids;
pub mod numeric;
pub mod order;
pub mod trade;
pub mod errors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::trade::*;
    pub use crate::errors::*;
}

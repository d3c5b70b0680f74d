//! NFT Matching Engine
//!
//! In-memory order matching for NFT markets. Each market owns an
//! [`OrderBook`] whose two sides hold price levels ([`Limit`]) of resting
//! orders in arrival order. Incoming limit and market orders are matched
//! against the opposite side with price-time priority.
//!
//! **Key Invariants:**
//! - A limit's volume equals the sum of its resting quantities
//! - A side's volume equals the sum of its limits' volumes
//! - No empty limit survives an operation
//! - A failed placement leaves the book untouched

pub mod book;
pub mod config;
pub mod events;
pub mod exchange;
pub mod feed;
pub mod matching;

pub use book::{BookSide, BookSnapshot, Limit, OrderBook, Placement};
pub use config::{ConfigError, ExchangeConfig};
pub use events::EngineEvent;
pub use exchange::{Exchange, OpenOrder};
pub use feed::{DropPolicy, FeedConfig, MatchFeed, SubscriberId};
pub use matching::{CrossingPolicy, MatchExecutor};

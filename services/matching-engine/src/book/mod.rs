//! Order book infrastructure module
//!
//! Contains price levels, book sides, and the per-market order book.

pub mod limit;
pub mod order_book;
pub mod side;

pub use limit::Limit;
pub use order_book::{BookSnapshot, OrderBook, Placement};
pub use side::BookSide;

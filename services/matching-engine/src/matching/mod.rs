//! Matching logic module
//!
//! Implements price-time priority matching

pub mod crossing;
pub mod executor;

pub use crossing::{can_match, incoming_can_match, CrossingPolicy};
pub use executor::MatchExecutor;

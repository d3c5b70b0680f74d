//! Price level implementation with FIFO queue
//!
//! A limit holds every resting order at one price on one side. Orders are
//! kept oldest-first so that equal-price orders fill in arrival order.

use std::collections::VecDeque;

use nft_types::errors::EngineError;
use nft_types::ids::{Instrument, OrderId};
use nft_types::numeric::Price;
use nft_types::order::Order;
use nft_types::trade::Match;
use serde::Serialize;

use crate::matching::MatchExecutor;

/// A price level containing orders at a specific price
///
/// `total_volume` is maintained incrementally and always equals the sum
/// of the member orders' open quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Limit {
    price: Price,
    /// Queue of orders at this price level (FIFO order)
    orders: VecDeque<Order>,
    total_volume: u64,
}

impl Limit {
    /// Create a new empty price level
    pub fn new(price: Price) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
            total_volume: 0,
        }
    }

    /// Append an order at the back of the queue (time priority)
    pub fn add(&mut self, order: Order) {
        self.total_volume += order.quantity;
        self.orders.push_back(order);
    }

    /// Remove an order by id, preserving the order of the rest of the queue
    ///
    /// Returns the removed order, or None if it is not at this level
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Order> {
        let position = self.orders.iter().position(|o| &o.id == order_id)?;
        let order = self.orders.remove(position)?;
        self.total_volume -= order.quantity;
        Some(order)
    }

    /// Verify that every resting order a fill of `quantity` units would
    /// touch trades `instrument`
    ///
    /// Returns the quantity still unfilled after this level.
    pub fn check_fill(&self, instrument: Instrument, quantity: u64) -> Result<u64, EngineError> {
        let mut remaining = quantity;
        for resting in &self.orders {
            if remaining == 0 {
                break;
            }
            if resting.instrument != instrument {
                return Err(EngineError::MismatchedInstrument {
                    resting: resting.instrument,
                    incoming: instrument,
                });
            }
            remaining -= remaining.min(resting.quantity);
        }
        Ok(remaining)
    }

    /// Match `incoming` against the resting orders, oldest first
    ///
    /// Stops as soon as `incoming` is filled. Resting orders that become
    /// filled are dropped from the queue once the pass completes. On an
    /// instrument mismatch nothing is mutated and no match is emitted.
    pub fn fill(
        &mut self,
        incoming: &mut Order,
        executor: &mut MatchExecutor,
        timestamp: i64,
    ) -> Result<Vec<Match>, EngineError> {
        self.check_fill(incoming.instrument, incoming.quantity)?;

        let mut matches = Vec::new();
        for resting in self.orders.iter_mut() {
            if incoming.is_filled() {
                break;
            }
            let m = executor.execute(self.price, resting, incoming, timestamp)?;
            self.total_volume -= m.size_filled;
            matches.push(m);
        }

        self.orders.retain(|o| !o.is_filled());
        Ok(matches)
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn total_volume(&self) -> u64 {
        self.total_volume
    }

    /// Resting orders, highest priority first
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| &o.id == order_id)
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Get the number of orders at this level
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

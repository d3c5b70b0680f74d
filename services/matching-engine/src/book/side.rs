//! One side of an order book
//!
//! Levels live in a `BTreeMap` keyed by price, which serves both as the
//! O(log n) price index and as the ordered list walked for best-price
//! selection. Asks iterate ascending, bids descending.

use std::collections::BTreeMap;

use nft_types::ids::OrderId;
use nft_types::numeric::Price;
use nft_types::order::{Order, Side};
use tracing::debug;

use super::limit::Limit;
use crate::matching::{incoming_can_match, CrossingPolicy};

#[derive(Debug, Clone)]
pub struct BookSide {
    side: Side,
    levels: BTreeMap<Price, Limit>,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Append an order to the level at `price`, creating the level if needed
    pub fn insert(&mut self, price: Price, order: Order) {
        let side = self.side;
        self.levels
            .entry(price)
            .or_insert_with(|| {
                debug!(%side, %price, "Price level created");
                Limit::new(price)
            })
            .add(order);
    }

    /// Remove an order from the level at `price`
    ///
    /// Drops the level if it becomes empty.
    pub fn remove(&mut self, price: Price, order_id: &OrderId) -> Option<Order> {
        let level = self.levels.get_mut(&price)?;
        let order = level.remove(order_id)?;
        self.remove_level_if_empty(price);
        Some(order)
    }

    /// Drop the level at `price` if it holds no orders
    pub fn remove_level_if_empty(&mut self, price: Price) -> bool {
        if self.levels.get(&price).is_some_and(Limit::is_empty) {
            self.levels.remove(&price);
            debug!(side = %self.side, %price, "Price level removed");
            return true;
        }
        false
    }

    pub fn get(&self, price: &Price) -> Option<&Limit> {
        self.levels.get(price)
    }

    pub(crate) fn get_mut(&mut self, price: &Price) -> Option<&mut Limit> {
        self.levels.get_mut(price)
    }

    /// Levels in best-price order
    pub fn iter_best_first(&self) -> Box<dyn Iterator<Item = &Limit> + '_> {
        match self.side {
            Side::Ask => Box::new(self.levels.values()),
            Side::Bid => Box::new(self.levels.values().rev()),
        }
    }

    /// Best price on this side: lowest ask or highest bid
    pub fn best_price(&self) -> Option<Price> {
        self.iter_best_first().next().map(Limit::price)
    }

    /// Prices, best first, that an incoming order limited at `limit_price`
    /// would trade against under `policy`
    pub fn crossable_prices(
        &self,
        incoming_side: Side,
        limit_price: Price,
        policy: CrossingPolicy,
    ) -> Vec<Price> {
        match policy {
            CrossingPolicy::ExactPrice => self
                .levels
                .get(&limit_price)
                .map(|level| vec![level.price()])
                .unwrap_or_default(),
            CrossingPolicy::PriceThrough => self
                .iter_best_first()
                .map(Limit::price)
                .take_while(|resting| incoming_can_match(incoming_side, limit_price, *resting))
                .collect(),
        }
    }

    /// All prices, best first
    pub fn prices_best_first(&self) -> Vec<Price> {
        self.iter_best_first().map(Limit::price).collect()
    }

    /// Sum of every level's volume
    pub fn total_volume(&self) -> u64 {
        self.levels.values().map(Limit::total_volume).sum()
    }

    /// Cloned levels in best-price order
    pub fn limits(&self) -> Vec<Limit> {
        self.iter_best_first().cloned().collect()
    }

    /// Get depth snapshot (top N price levels)
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, u64)> {
        self.iter_best_first()
            .take(depth)
            .map(|level| (level.price(), level.total_volume()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Get the total number of price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

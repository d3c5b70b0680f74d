//! Order book for a single market
//!
//! Both sides plus the order-location index live behind one
//! reader/writer lock. Placements and cancellations hold the write lock
//! for their whole body, so they are serialized per market; queries take
//! the read lock.

use std::collections::HashMap;

use nft_types::errors::EngineError;
use nft_types::ids::{MarketId, OrderId};
use nft_types::numeric::Price;
use nft_types::order::{now_nanos, Order, Side};
use nft_types::trade::Match;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::limit::Limit;
use super::side::BookSide;
use crate::matching::{CrossingPolicy, MatchExecutor};

/// Outcome of placing an order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// The incoming order in its final state
    pub order: Order,
    /// Matches in execution order
    pub matches: Vec<Match>,
    /// Price the order now rests at, if any remainder was booked
    pub resting_price: Option<Price>,
    /// Opposite levels left untouched because their resting orders trade a
    /// different instrument
    pub mismatched_levels: Vec<Price>,
}

impl Placement {
    pub fn rested(&self) -> bool {
        self.resting_price.is_some()
    }

    pub fn filled_quantity(&self) -> u64 {
        self.matches.iter().map(|m| m.size_filled).sum()
    }
}

/// Consistent view of one market taken under a single read lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookSnapshot {
    pub market: MarketId,
    /// Ask levels in ascending price order (best first)
    pub asks: Vec<Limit>,
    /// Bid levels in descending price order (best first)
    pub bids: Vec<Limit>,
    pub ask_total_volume: u64,
    pub bid_total_volume: u64,
}

/// Mutable state guarded by the book lock
#[derive(Debug)]
struct BookState {
    bids: BookSide,
    asks: BookSide,
    /// Where each resting order lives: order id -> (side, price)
    locations: HashMap<OrderId, (Side, Price)>,
    executor: MatchExecutor,
}

impl BookState {
    fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Fill `incoming` against the opposite-side levels at `prices`, best
    /// first
    ///
    /// Every resting order the sweep would touch is checked for a matching
    /// instrument before anything is mutated. With `skip_mismatched` a level
    /// failing the check is passed over and reported; otherwise the whole
    /// sweep fails. Returns the matches and the skipped levels.
    fn sweep(
        &mut self,
        incoming: &mut Order,
        prices: &[Price],
        skip_mismatched: bool,
    ) -> Result<(Vec<Match>, Vec<Price>), EngineError> {
        let resting_side = incoming.side.opposite();
        let BookState {
            bids,
            asks,
            locations,
            executor,
        } = self;
        let book = match resting_side {
            Side::Bid => bids,
            Side::Ask => asks,
        };

        let mut remaining = incoming.quantity;
        let mut fillable = Vec::with_capacity(prices.len());
        let mut skipped = Vec::new();
        for price in prices {
            if remaining == 0 {
                break;
            }
            let Some(level) = book.get(price) else {
                continue;
            };
            match level.check_fill(incoming.instrument, remaining) {
                Ok(left) => {
                    remaining = left;
                    fillable.push(*price);
                }
                Err(err) if skip_mismatched => {
                    warn!(%price, error = %err, "Instrument mismatch, level skipped");
                    skipped.push(*price);
                }
                Err(err) => {
                    warn!(%price, error = %err, "Instrument mismatch aborted fill");
                    return Err(err);
                }
            }
        }

        let timestamp = now_nanos();
        let mut matches = Vec::new();
        for price in &fillable {
            if incoming.is_filled() {
                break;
            }
            let Some(level) = book.get_mut(price) else {
                continue;
            };
            let fills = level.fill(incoming, executor, timestamp)?;
            for m in &fills {
                debug!(
                    sequence = m.sequence,
                    price = %m.price,
                    size = m.size_filled,
                    bid = %m.bid.order_id,
                    ask = %m.ask.order_id,
                    "Orders matched"
                );
                let resting = m.order(resting_side);
                if resting.is_filled() {
                    locations.remove(&resting.order_id);
                }
            }
            matches.extend(fills);
            book.remove_level_if_empty(*price);
        }

        Ok((matches, skipped))
    }

    fn rest(&mut self, price: Price, order: Order) {
        self.locations.insert(order.id, (order.side, price));
        match order.side {
            Side::Bid => self.bids.insert(price, order),
            Side::Ask => self.asks.insert(price, order),
        }
    }
}

/// Order book for one market
#[derive(Debug)]
pub struct OrderBook {
    market: MarketId,
    policy: CrossingPolicy,
    state: RwLock<BookState>,
}

impl OrderBook {
    pub fn new(market: MarketId, policy: CrossingPolicy) -> Self {
        Self {
            market,
            policy,
            state: RwLock::new(BookState {
                bids: BookSide::new(Side::Bid),
                asks: BookSide::new(Side::Ask),
                locations: HashMap::new(),
                executor: MatchExecutor::default(),
            }),
        }
    }

    pub fn market(&self) -> &MarketId {
        &self.market
    }

    pub fn crossing_policy(&self) -> CrossingPolicy {
        self.policy
    }

    /// Place a limit order at `price`
    ///
    /// Crosses the opposite side according to the book's crossing policy,
    /// then books any unfilled remainder on the order's own side. Levels
    /// holding a different instrument are not crossed; they are listed in
    /// [`Placement::mismatched_levels`]. Fails with `DuplicateOrder` if an
    /// order with the same id already rests here.
    pub fn place_limit_order(&self, price: Price, order: Order) -> Result<Placement, EngineError> {
        self.place_limit_order_with(price, order, |_| {})
    }

    /// Like [`place_limit_order`](Self::place_limit_order), running
    /// `on_commit` before the write lock is released
    pub(crate) fn place_limit_order_with(
        &self,
        price: Price,
        mut order: Order,
        on_commit: impl FnOnce(&Placement),
    ) -> Result<Placement, EngineError> {
        let mut state = self.state.write();

        if state.locations.contains_key(&order.id) {
            warn!(market = %self.market, order_id = %order.id, "Duplicate limit order rejected");
            return Err(EngineError::DuplicateOrder { order_id: order.id });
        }

        let prices = state
            .side(order.side.opposite())
            .crossable_prices(order.side, price, self.policy);
        let (matches, mismatched_levels) = state.sweep(&mut order, &prices, true)?;

        let mut resting_price = None;
        if !order.is_filled() {
            info!(
                market = %self.market,
                %price,
                side = %order.side,
                size = order.quantity,
                owner = %order.owner,
                "New limit order"
            );
            state.rest(price, order.clone());
            resting_price = Some(price);
        }

        let placement = Placement {
            order,
            matches,
            resting_price,
            mismatched_levels,
        };
        on_commit(&placement);
        Ok(placement)
    }

    /// Execute a market order against the best opposite levels
    ///
    /// All-or-nothing: fails with `InsufficientLiquidity` and leaves the
    /// book untouched if the opposite side cannot absorb the full quantity.
    pub fn place_market_order(&self, order: Order) -> Result<Placement, EngineError> {
        self.place_market_order_with(order, |_| {})
    }

    pub(crate) fn place_market_order_with(
        &self,
        mut order: Order,
        on_commit: impl FnOnce(&Placement),
    ) -> Result<Placement, EngineError> {
        let mut state = self.state.write();

        let opposite = state.side(order.side.opposite());
        let available = opposite.total_volume();
        if order.quantity > available {
            warn!(
                market = %self.market,
                side = %order.side,
                requested = order.quantity,
                available,
                "Market order rejected: insufficient liquidity"
            );
            return Err(EngineError::InsufficientLiquidity {
                requested: order.quantity,
                available,
            });
        }

        let prices = opposite.prices_best_first();
        let (matches, _) = state.sweep(&mut order, &prices, false)?;

        let placement = Placement {
            order,
            matches,
            resting_price: None,
            mismatched_levels: Vec::new(),
        };
        on_commit(&placement);
        Ok(placement)
    }

    /// Remove a resting order
    pub fn cancel_order(&self, order: &Order) -> Result<Order, EngineError> {
        self.cancel_order_by_id(order.side, &order.id)
    }

    /// Remove the order `order_id` resting on `side`
    ///
    /// Fails with `OrderNotFound` if it does not rest on that side.
    pub fn cancel_order_by_id(&self, side: Side, order_id: &OrderId) -> Result<Order, EngineError> {
        self.cancel_order_with(side, order_id, |_| {})
    }

    pub(crate) fn cancel_order_with(
        &self,
        side: Side,
        order_id: &OrderId,
        on_commit: impl FnOnce(&Order),
    ) -> Result<Order, EngineError> {
        let mut state = self.state.write();
        let not_found = || EngineError::OrderNotFound { order_id: *order_id };

        let (rest_side, price) = match state.locations.get(order_id) {
            Some(&(rest_side, price)) if rest_side == side => (rest_side, price),
            _ => return Err(not_found()),
        };

        let removed = match rest_side {
            Side::Bid => state.bids.remove(price, order_id),
            Side::Ask => state.asks.remove(price, order_id),
        };
        let mut order = removed.ok_or_else(not_found)?;
        state.locations.remove(order_id);
        order.cancel();

        info!(
            market = %self.market,
            order_id = %order.id,
            %price,
            side = %order.side,
            "Order canceled"
        );
        on_commit(&order);
        Ok(order)
    }

    /// Look up a resting order
    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        let state = self.state.read();
        let &(side, price) = state.locations.get(order_id)?;
        state.side(side).get(&price)?.get(order_id).cloned()
    }

    pub fn bid_total_volume(&self) -> u64 {
        self.state.read().bids.total_volume()
    }

    pub fn ask_total_volume(&self) -> u64 {
        self.state.read().asks.total_volume()
    }

    /// Ask levels, lowest price first
    pub fn asks(&self) -> Vec<Limit> {
        self.state.read().asks.limits()
    }

    /// Bid levels, highest price first
    pub fn bids(&self) -> Vec<Limit> {
        self.state.read().bids.limits()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.state.read().asks.best_price()
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.state.read().bids.best_price()
    }

    /// Top `depth` levels per side as (price, volume)
    pub fn depth(&self, depth: usize) -> (Vec<(Price, u64)>, Vec<(Price, u64)>) {
        let state = self.state.read();
        (state.bids.depth_snapshot(depth), state.asks.depth_snapshot(depth))
    }

    /// Number of resting orders across both sides
    pub fn order_count(&self) -> usize {
        self.state.read().locations.len()
    }

    pub fn snapshot(&self) -> BookSnapshot {
        let state = self.state.read();
        BookSnapshot {
            market: self.market.clone(),
            asks: state.asks.limits(),
            bids: state.bids.limits(),
            ask_total_volume: state.asks.total_volume(),
            bid_total_volume: state.bids.total_volume(),
        }
    }
}

//! Exchange: the registry of per-market order books
//!
//! Routes placements to the right book, keeps an index of each owner's
//! open orders, and publishes engine events to feed subscribers.
//!
//! Index and feed updates run while the book's write lock is still held,
//! so they observe placements on one market in the same order the book
//! applied them. The lock order is always book, then index or feed.

use std::collections::HashMap;

use dashmap::DashMap;
use nft_types::errors::EngineError;
use nft_types::ids::{AccountId, MarketId, OrderId};
use nft_types::numeric::Price;
use nft_types::order::{Order, Side};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::book::{BookSnapshot, OrderBook, Placement};
use crate::config::{ConfigError, ExchangeConfig};
use crate::events::EngineEvent;
use crate::feed::{MatchFeed, SubscriberId};

/// Owner-index entry for a resting order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpenOrder {
    pub market: MarketId,
    pub price: Price,
    pub side: Side,
    pub order_id: OrderId,
}

pub struct Exchange {
    books: HashMap<MarketId, OrderBook>,
    /// owner -> their resting orders; ids are only unique within a market
    owners: DashMap<AccountId, HashMap<(MarketId, OrderId), OpenOrder>>,
    feed: Mutex<MatchFeed>,
}

impl Exchange {
    pub fn new(config: ExchangeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            markets = config.markets.len(),
            crossing = ?config.crossing,
            feed_capacity = config.feed.queue_capacity,
            "Exchange initialized"
        );
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: ExchangeConfig) -> Self {
        let books = config
            .markets
            .iter()
            .map(|market| (market.clone(), OrderBook::new(market.clone(), config.crossing)))
            .collect();

        Self {
            books,
            owners: DashMap::new(),
            feed: Mutex::new(MatchFeed::new(config.feed)),
        }
    }

    /// Exchange with default settings trading the given markets
    pub fn with_markets(markets: impl IntoIterator<Item = MarketId>) -> Result<Self, ConfigError> {
        Self::new(ExchangeConfig::default().with_markets(markets))
    }

    /// Resolve the book for `market`
    pub fn order_book(&self, market: &MarketId) -> Result<&OrderBook, EngineError> {
        self.books.get(market).ok_or_else(|| EngineError::MarketNotFound {
            market: market.clone(),
        })
    }

    /// Registered market symbols, sorted
    pub fn markets(&self) -> Vec<MarketId> {
        let mut markets: Vec<MarketId> = self.books.keys().cloned().collect();
        markets.sort();
        markets
    }

    pub fn place_limit_order(
        &self,
        market: &MarketId,
        price: Price,
        order: Order,
    ) -> Result<Placement, EngineError> {
        let book = self.order_book(market)?;
        book.place_limit_order_with(price, order, |placement| self.commit_placement(market, placement))
    }

    pub fn place_market_order(&self, market: &MarketId, order: Order) -> Result<Placement, EngineError> {
        let book = self.order_book(market)?;
        book.place_market_order_with(order, |placement| self.commit_placement(market, placement))
    }

    /// Cancel the order `order_id` resting on `side` of `market`
    pub fn cancel_order(
        &self,
        market: &MarketId,
        side: Side,
        order_id: &OrderId,
    ) -> Result<Order, EngineError> {
        let book = self.order_book(market)?;
        book.cancel_order_with(side, order_id, |order| {
            self.unindex(&order.owner, market, &order.id);
            self.publish(EngineEvent::OrderCanceled {
                market: market.clone(),
                order: order.clone(),
            });
        })
    }

    pub fn snapshot(&self, market: &MarketId) -> Result<BookSnapshot, EngineError> {
        Ok(self.order_book(market)?.snapshot())
    }

    /// Resting orders of `owner` across all markets
    pub fn open_orders(&self, owner: &AccountId) -> Vec<OpenOrder> {
        let mut orders: Vec<OpenOrder> = self
            .owners
            .get(owner)
            .map(|entry| entry.values().cloned().collect())
            .unwrap_or_default();
        orders.sort();
        orders
    }

    pub fn subscribe(&self) -> SubscriberId {
        self.feed.lock().subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.feed.lock().unsubscribe(id)
    }

    /// Take the pending events for a subscriber
    pub fn drain_events(&self, id: SubscriberId) -> Vec<EngineEvent> {
        self.feed.lock().drain(id)
    }

    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.feed.lock().is_subscribed(id)
    }

    /// Reconcile the owner index with a placement and publish its events
    ///
    /// A counterparty leaves the index only once its order is filled; the
    /// incoming order joins it if any remainder rested.
    fn commit_placement(&self, market: &MarketId, placement: &Placement) {
        let resting_side = placement.order.side.opposite();
        for m in &placement.matches {
            let counterparty = m.order(resting_side);
            if counterparty.is_filled() {
                self.unindex(&counterparty.owner, market, &counterparty.order_id);
            }
        }

        if let Some(price) = placement.resting_price {
            let order = &placement.order;
            self.owners.entry(order.owner.clone()).or_default().insert(
                (market.clone(), order.id),
                OpenOrder {
                    market: market.clone(),
                    price,
                    side: order.side,
                    order_id: order.id,
                },
            );
        }

        if placement.matches.is_empty() && placement.resting_price.is_none() {
            return;
        }
        let mut feed = self.feed.lock();
        let mut disconnected = Vec::new();
        for m in &placement.matches {
            disconnected.extend(feed.publish(&EngineEvent::Matched {
                market: market.clone(),
                trade: m.clone(),
            }));
        }
        if let Some(price) = placement.resting_price {
            disconnected.extend(feed.publish(&EngineEvent::OrderRested {
                market: market.clone(),
                price,
                order: placement.order.clone(),
            }));
        }
        log_disconnects(market, &disconnected);
    }

    fn unindex(&self, owner: &AccountId, market: &MarketId, order_id: &OrderId) {
        let now_empty = match self.owners.get_mut(owner) {
            Some(mut entry) => {
                entry.remove(&(market.clone(), *order_id));
                entry.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.owners.remove_if(owner, |_, orders| orders.is_empty());
        }
    }

    fn publish(&self, event: EngineEvent) {
        let disconnected = self.feed.lock().publish(&event);
        log_disconnects(event.market(), &disconnected);
    }
}

fn log_disconnects(market: &MarketId, disconnected: &[SubscriberId]) {
    if !disconnected.is_empty() {
        debug!(%market, subscribers = ?disconnected, "Feed subscribers dropped during publish");
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::from_validated(ExchangeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{DropPolicy, FeedConfig};
    use nft_types::ids::Instrument;

    fn fra() -> MarketId {
        MarketId::new("fra")
    }

    fn order(owner: &str, side: Side, quantity: u64, timestamp: i64) -> Order {
        Order::with_timestamp(
            AccountId::new(owner),
            "ETH",
            side,
            Instrument::new(1, 2),
            quantity,
            timestamp,
        )
    }

    #[test]
    fn test_unknown_market() {
        let ex = Exchange::default();
        let missing = MarketId::new("nowhere");

        assert!(matches!(
            ex.order_book(&missing),
            Err(EngineError::MarketNotFound { market }) if market == missing
        ));
        assert!(ex.place_market_order(&missing, order("0xa", Side::Bid, 1, 1)).is_err());
        assert!(ex.snapshot(&missing).is_err());
    }

    #[test]
    fn test_markets_sorted() {
        let ex = Exchange::with_markets([MarketId::new("zrh"), MarketId::new("ams")]).unwrap();
        assert_eq!(ex.markets(), vec![MarketId::new("ams"), MarketId::new("zrh")]);
    }

    #[test]
    fn test_resting_order_is_indexed() {
        let ex = Exchange::default();
        let bid = order("0xalice", Side::Bid, 1, 1);
        let bid_id = bid.id;

        ex.place_limit_order(&fra(), Price::from_u64(10_000), bid).unwrap();

        let open = ex.open_orders(&AccountId::new("0xalice"));
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].order_id, bid_id);
        assert_eq!(open[0].side, Side::Bid);
        assert_eq!(open[0].price, Price::from_u64(10_000));
    }

    #[test]
    fn test_filled_counterparty_leaves_index() {
        let ex = Exchange::default();
        ex.place_limit_order(&fra(), Price::from_u64(10_000), order("0xseller", Side::Ask, 1, 1))
            .unwrap();

        let placement = ex
            .place_limit_order(&fra(), Price::from_u64(10_000), order("0xbuyer", Side::Bid, 1, 2))
            .unwrap();

        assert_eq!(placement.matches.len(), 1);
        assert!(ex.open_orders(&AccountId::new("0xseller")).is_empty());
        assert!(ex.open_orders(&AccountId::new("0xbuyer")).is_empty());
    }

    #[test]
    fn test_partial_counterparty_stays_indexed() {
        let ex = Exchange::default();
        let ask = order("0xseller", Side::Ask, 5, 1);
        let other = order("0xseller", Side::Ask, 1, 2);
        ex.place_limit_order(&fra(), Price::from_u64(10_000), ask.clone()).unwrap();
        ex.place_limit_order(&fra(), Price::from_u64(12_000), other).unwrap();

        ex.place_market_order(&fra(), order("0xbuyer", Side::Bid, 2, 3)).unwrap();

        let open = ex.open_orders(&AccountId::new("0xseller"));
        assert_eq!(open.len(), 2);
        assert!(open.iter().any(|o| o.order_id == ask.id));
    }

    #[test]
    fn test_cancel_removes_from_index() {
        let ex = Exchange::default();
        let bid = order("0xalice", Side::Bid, 5, 1);
        ex.place_limit_order(&fra(), Price::from_u64(10_000), bid.clone()).unwrap();

        assert!(matches!(
            ex.cancel_order(&fra(), Side::Ask, &bid.id),
            Err(EngineError::OrderNotFound { .. })
        ));

        let canceled = ex.cancel_order(&fra(), Side::Bid, &bid.id).unwrap();
        assert_eq!(canceled.id, bid.id);
        assert!(ex.open_orders(&AccountId::new("0xalice")).is_empty());
        assert_eq!(ex.snapshot(&fra()).unwrap().bid_total_volume, 0);
    }

    #[test]
    fn test_feed_receives_events_in_order() {
        let ex = Exchange::default();
        let sub = ex.subscribe();

        ex.place_limit_order(&fra(), Price::from_u64(10_000), order("0xseller", Side::Ask, 2, 1))
            .unwrap();
        ex.place_market_order(&fra(), order("0xbuyer", Side::Bid, 1, 2)).unwrap();

        let events = ex.drain_events(sub);
        let labels: Vec<&str> = events.iter().map(EngineEvent::event_type_label).collect();
        assert_eq!(labels, vec!["order_rested", "matched"]);
        assert!(ex.drain_events(sub).is_empty());
    }

    #[test]
    fn test_failed_placement_publishes_nothing() {
        let ex = Exchange::default();
        let sub = ex.subscribe();

        let err = ex.place_market_order(&fra(), order("0xbuyer", Side::Bid, 1, 1)).unwrap_err();

        assert!(matches!(err, EngineError::InsufficientLiquidity { requested: 1, available: 0 }));
        assert!(ex.drain_events(sub).is_empty());
        assert!(ex.unsubscribe(sub));
        assert!(!ex.is_subscribed(sub));
    }

    #[test]
    fn test_duplicate_placement_keeps_single_index_entry() {
        let ex = Exchange::default();
        let sub = ex.subscribe();
        let bid = order("0xalice", Side::Bid, 1, 1);
        ex.place_limit_order(&fra(), Price::from_u64(100), bid.clone()).unwrap();

        let err = ex
            .place_limit_order(&fra(), Price::from_u64(200), bid.clone())
            .unwrap_err();

        assert_eq!(err, EngineError::DuplicateOrder { order_id: bid.id });
        assert_eq!(ex.drain_events(sub).len(), 1);
        let open = ex.open_orders(&AccountId::new("0xalice"));
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].price, Price::from_u64(100));

        ex.cancel_order(&fra(), Side::Bid, &bid.id).unwrap();
        assert_eq!(ex.snapshot(&fra()).unwrap().bid_total_volume, 0);
        assert!(ex.open_orders(&AccountId::new("0xalice")).is_empty());
    }

    #[test]
    fn test_limit_order_for_other_token_rests_and_is_indexed() {
        let ex = Exchange::default();
        let sub = ex.subscribe();
        ex.place_limit_order(&fra(), Price::from_u64(10_000), order("0xseller", Side::Ask, 1, 1))
            .unwrap();
        let bid = Order::with_timestamp(
            AccountId::new("0xbuyer"),
            "ETH",
            Side::Bid,
            Instrument::new(1, 3),
            1,
            2,
        );

        let placement = ex.place_limit_order(&fra(), Price::from_u64(10_000), bid.clone()).unwrap();

        assert!(placement.matches.is_empty());
        assert_eq!(placement.mismatched_levels, vec![Price::from_u64(10_000)]);
        assert_eq!(ex.open_orders(&AccountId::new("0xbuyer"))[0].order_id, bid.id);
        assert_eq!(ex.open_orders(&AccountId::new("0xseller")).len(), 1);
        let labels: Vec<&str> = ex.drain_events(sub).iter().map(EngineEvent::event_type_label).collect();
        assert_eq!(labels, vec!["order_rested", "order_rested"]);
    }

    #[test]
    fn test_cancel_disconnects_lagging_subscriber() {
        let ex = Exchange::new(ExchangeConfig {
            feed: FeedConfig {
                queue_capacity: 1,
                drop_policy: DropPolicy::Disconnect,
            },
            ..ExchangeConfig::default()
        })
        .unwrap();
        let sub = ex.subscribe();
        let bid = order("0xalice", Side::Bid, 1, 1);
        ex.place_limit_order(&fra(), Price::from_u64(100), bid.clone()).unwrap();

        ex.cancel_order(&fra(), Side::Bid, &bid.id).unwrap();

        assert!(!ex.is_subscribed(sub));
        assert_eq!(ex.feed.lock().total_disconnects(), 1);
    }

    #[test]
    fn test_same_id_on_two_markets_indexed_separately() {
        let ex = Exchange::with_markets([MarketId::new("fra"), MarketId::new("ams")]).unwrap();
        let bid = order("0xalice", Side::Bid, 1, 1);
        ex.place_limit_order(&fra(), Price::from_u64(100), bid.clone()).unwrap();
        ex.place_limit_order(&MarketId::new("ams"), Price::from_u64(100), bid.clone())
            .unwrap();

        ex.cancel_order(&fra(), Side::Bid, &bid.id).unwrap();

        let open = ex.open_orders(&AccountId::new("0xalice"));
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].market.as_str(), "ams");
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Exchange::with_markets(Vec::new()).is_err());
    }
}

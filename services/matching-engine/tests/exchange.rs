//! Exchange routing, owner index and event feed

use matching_engine::{
    CrossingPolicy, DropPolicy, EngineEvent, Exchange, ExchangeConfig, FeedConfig,
};
use nft_types::errors::EngineError;
use nft_types::ids::{AccountId, Instrument, MarketId};
use nft_types::numeric::Price;
use nft_types::order::{Order, OrderStatus, Side};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("matching_engine=debug")
        .with_test_writer()
        .try_init();
}

fn order(owner: &str, side: Side, quantity: u64, timestamp: i64) -> Order {
    Order::with_timestamp(
        AccountId::new(owner),
        "ETH",
        side,
        Instrument::new(7, 42),
        quantity,
        timestamp,
    )
}

fn two_market_exchange() -> Exchange {
    Exchange::new(
        ExchangeConfig::default().with_markets([MarketId::new("fra"), MarketId::new("ams")]),
    )
    .unwrap()
}

#[test]
fn test_markets_are_independent() {
    init_tracing();
    let ex = two_market_exchange();
    let fra = MarketId::new("fra");
    let ams = MarketId::new("ams");

    ex.place_limit_order(&fra, Price::from_u64(100), order("0xa", Side::Ask, 3, 1))
        .unwrap();

    let err = ex.place_market_order(&ams, order("0xb", Side::Bid, 1, 2)).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientLiquidity { .. }));

    assert_eq!(ex.snapshot(&fra).unwrap().ask_total_volume, 3);
    assert_eq!(ex.snapshot(&ams).unwrap().ask_total_volume, 0);
}

#[test]
fn test_unregistered_market_is_reported() {
    let ex = Exchange::default();
    let lon = MarketId::new("lon");

    let err = ex
        .place_limit_order(&lon, Price::from_u64(100), order("0xa", Side::Bid, 1, 1))
        .unwrap_err();
    assert_eq!(err, EngineError::MarketNotFound { market: lon.clone() });
    assert_eq!(err.to_string(), "market not found: lon");
    assert!(ex.cancel_order(&lon, Side::Bid, &order("0xa", Side::Bid, 1, 1).id).is_err());
}

#[test]
fn test_open_orders_span_markets() {
    let ex = two_market_exchange();
    let fra = MarketId::new("fra");
    let ams = MarketId::new("ams");

    ex.place_limit_order(&fra, Price::from_u64(100), order("0xa", Side::Bid, 1, 1))
        .unwrap();
    ex.place_limit_order(&ams, Price::from_u64(200), order("0xa", Side::Ask, 1, 2))
        .unwrap();

    let open = ex.open_orders(&AccountId::new("0xa"));
    let markets: Vec<&str> = open.iter().map(|o| o.market.as_str()).collect();
    assert_eq!(markets, vec!["ams", "fra"]);
}

#[test]
fn test_matched_incoming_order_is_not_indexed() {
    let ex = Exchange::default();
    let fra = MarketId::new("fra");

    ex.place_limit_order(&fra, Price::from_u64(100), order("0xseller", Side::Ask, 4, 1))
        .unwrap();
    let placement = ex
        .place_limit_order(&fra, Price::from_u64(100), order("0xbuyer", Side::Bid, 4, 2))
        .unwrap();

    assert_eq!(placement.order.status, OrderStatus::Filled);
    assert!(ex.open_orders(&AccountId::new("0xbuyer")).is_empty());
    assert!(ex.open_orders(&AccountId::new("0xseller")).is_empty());
}

#[test]
fn test_partially_filled_counterparty_keeps_other_orders() {
    let ex = Exchange::default();
    let fra = MarketId::new("fra");

    let small = order("0xseller", Side::Ask, 1, 1);
    let large = order("0xseller", Side::Ask, 10, 2);
    ex.place_limit_order(&fra, Price::from_u64(100), small.clone()).unwrap();
    ex.place_limit_order(&fra, Price::from_u64(100), large.clone()).unwrap();

    ex.place_market_order(&fra, order("0xbuyer", Side::Bid, 3, 3)).unwrap();

    let open = ex.open_orders(&AccountId::new("0xseller"));
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].order_id, large.id);
    assert_eq!(
        ex.order_book(&fra).unwrap().order(&large.id).map(|o| o.quantity),
        Some(8)
    );
}

#[test]
fn test_cancel_publishes_and_unindexes() {
    let ex = Exchange::default();
    let fra = MarketId::new("fra");
    let sub = ex.subscribe();

    let bid = order("0xa", Side::Bid, 2, 1);
    ex.place_limit_order(&fra, Price::from_u64(100), bid.clone()).unwrap();
    let canceled = ex.cancel_order(&fra, Side::Bid, &bid.id).unwrap();

    assert_eq!(canceled.status, OrderStatus::Canceled);
    assert!(ex.open_orders(&AccountId::new("0xa")).is_empty());

    let events = ex.drain_events(sub);
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[1], EngineEvent::OrderCanceled { order, .. } if order.id == bid.id));

    let err = ex.cancel_order(&fra, Side::Bid, &bid.id).unwrap_err();
    assert_eq!(err, EngineError::OrderNotFound { order_id: bid.id });
}

#[test]
fn test_feed_match_events_carry_sequence() {
    let ex = Exchange::default();
    let fra = MarketId::new("fra");
    let sub = ex.subscribe();

    ex.place_limit_order(&fra, Price::from_u64(100), order("0xs", Side::Ask, 1, 1))
        .unwrap();
    ex.place_limit_order(&fra, Price::from_u64(101), order("0xs", Side::Ask, 1, 2))
        .unwrap();
    ex.place_market_order(&fra, order("0xb", Side::Bid, 2, 3)).unwrap();

    let sequences: Vec<u64> = ex
        .drain_events(sub)
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::Matched { trade, .. } => Some(trade.sequence),
            _ => None,
        })
        .collect();
    assert_eq!(sequences.len(), 2);
    assert!(sequences[0] < sequences[1]);
}

#[test]
fn test_lagging_subscriber_is_disconnected() {
    let ex = Exchange::new(ExchangeConfig {
        feed: FeedConfig {
            queue_capacity: 1,
            drop_policy: DropPolicy::Disconnect,
        },
        ..ExchangeConfig::default()
    })
    .unwrap();
    let fra = MarketId::new("fra");
    let sub = ex.subscribe();

    ex.place_limit_order(&fra, Price::from_u64(100), order("0xa", Side::Bid, 1, 1))
        .unwrap();
    assert!(ex.is_subscribed(sub));
    ex.place_limit_order(&fra, Price::from_u64(101), order("0xa", Side::Bid, 1, 2))
        .unwrap();

    assert!(!ex.is_subscribed(sub));
    assert!(ex.drain_events(sub).is_empty());
}

#[test]
fn test_crossing_policy_from_config() {
    let config =
        ExchangeConfig::from_json_str(r#"{ "markets": ["fra"], "crossing": "price_through" }"#)
            .unwrap();
    let ex = Exchange::new(config).unwrap();
    let fra = MarketId::new("fra");
    assert_eq!(
        ex.order_book(&fra).unwrap().crossing_policy(),
        CrossingPolicy::PriceThrough
    );

    ex.place_limit_order(&fra, Price::from_u64(90), order("0xs", Side::Ask, 1, 1))
        .unwrap();
    let placement = ex
        .place_limit_order(&fra, Price::from_u64(100), order("0xb", Side::Bid, 1, 2))
        .unwrap();
    assert_eq!(placement.matches.len(), 1);
    assert_eq!(placement.matches[0].price, Price::from_u64(90));
}

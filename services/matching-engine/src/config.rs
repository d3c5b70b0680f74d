//! Exchange configuration
//!
//! Loaded from JSON; every field is optional and falls back to the
//! defaults below.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use nft_types::ids::MarketId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::feed::FeedConfig;
use crate::matching::CrossingPolicy;

pub const DEFAULT_MARKET: &str = "fra";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("at least one market must be configured")]
    NoMarkets,

    #[error("market listed twice: {0}")]
    DuplicateMarket(MarketId),

    #[error("feed queue capacity must be positive")]
    InvalidCapacity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Markets opened at startup; the set is fixed for the process lifetime
    pub markets: Vec<MarketId>,
    pub crossing: CrossingPolicy,
    pub feed: FeedConfig,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            markets: vec![MarketId::new(DEFAULT_MARKET)],
            crossing: CrossingPolicy::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl ExchangeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.markets.is_empty() {
            return Err(ConfigError::NoMarkets);
        }
        let mut seen = HashSet::new();
        for market in &self.markets {
            if !seen.insert(market) {
                return Err(ConfigError::DuplicateMarket(market.clone()));
            }
        }
        if self.feed.queue_capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        Ok(())
    }

    pub fn with_markets(mut self, markets: impl IntoIterator<Item = MarketId>) -> Self {
        self.markets = markets.into_iter().collect();
        self
    }

    pub fn with_crossing(mut self, crossing: CrossingPolicy) -> Self {
        self.crossing = crossing;
        self
    }
}

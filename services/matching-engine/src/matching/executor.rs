//! Match execution logic
//!
//! Pairs one resting order with one incoming order and produces the
//! `Match` record for the pairing.

use nft_types::errors::EngineError;
use nft_types::numeric::Price;
use nft_types::order::Order;
use nft_types::trade::Match;

/// Match executor with per-book sequence generation
#[derive(Debug)]
pub struct MatchExecutor {
    sequence_counter: u64,
}

impl MatchExecutor {
    /// Create a new match executor with starting sequence number
    pub fn new(starting_sequence: u64) -> Self {
        Self {
            sequence_counter: starting_sequence,
        }
    }

    /// Get next sequence number (monotonically increasing)
    fn next_sequence(&mut self) -> u64 {
        let seq = self.sequence_counter;
        self.sequence_counter += 1;
        seq
    }

    /// Sequence number the next match will carry
    pub fn peek_sequence(&self) -> u64 {
        self.sequence_counter
    }

    /// Fill `resting` and `incoming` against each other at `price`
    ///
    /// The filled size is the smaller of the two open quantities and both
    /// orders are reduced by exactly that amount.
    pub fn execute(
        &mut self,
        price: Price,
        resting: &mut Order,
        incoming: &mut Order,
        timestamp: i64,
    ) -> Result<Match, EngineError> {
        if resting.instrument != incoming.instrument {
            return Err(EngineError::MismatchedInstrument {
                resting: resting.instrument,
                incoming: incoming.instrument,
            });
        }

        let size_filled = resting.quantity.min(incoming.quantity);
        resting.reduce(size_filled);
        incoming.reduce(size_filled);

        let (bid, ask) = if incoming.is_bid() {
            (&*incoming, &*resting)
        } else {
            (&*resting, &*incoming)
        };

        Ok(Match {
            sequence: self.next_sequence(),
            instrument: incoming.instrument,
            price,
            size_filled,
            timestamp,
            bid: bid.into(),
            ask: ask.into(),
        })
    }
}

impl Default for MatchExecutor {
    fn default() -> Self {
        Self::new(1)
    }
}

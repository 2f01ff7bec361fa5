//! Recent trade tape
//!
//! Fixed-capacity history of public trades, newest first. Trades carry no
//! sequencing contract, so out-of-order prints are kept in arrival order
//! without complaint.

use std::collections::VecDeque;

use types::trade::TradeEvent;

/// Default number of trades retained.
pub const DEFAULT_TRADE_CAPACITY: usize = 50;

/// Bounded most-recent-first trade history.
#[derive(Debug, Clone)]
pub struct TradeTape {
    /// Front = most recent.
    history: VecDeque<TradeEvent>,
    capacity: usize,
    /// Trades recorded since creation, including evicted ones.
    recorded: u64,
}

impl TradeTape {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            recorded: 0,
        }
    }

    /// Record a trade, evicting the oldest when full.
    pub fn record(&mut self, trade: TradeEvent) {
        if self.capacity == 0 {
            return;
        }
        if self.history.len() >= self.capacity {
            self.history.pop_back();
        }
        self.history.push_front(trade);
        self.recorded += 1;
    }

    /// Recent trades, most recent first.
    pub fn recent(&self) -> Vec<TradeEvent> {
        self.history.iter().cloned().collect()
    }

    /// Most recent trade.
    pub fn last(&self) -> Option<&TradeEvent> {
        self.history.front()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Total trades recorded since creation.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }
}

impl Default for TradeTape {
    fn default() -> Self {
        Self::new(DEFAULT_TRADE_CAPACITY)
    }
}

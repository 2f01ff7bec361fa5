//! Public trade prints
//!
//! Trades are independent facts: no sequencing contract, no reconciliation.

use crate::book::Side;
use crate::numeric::{Price, Quantity};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single executed trade as published by the exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Exchange-assigned trade id
    pub trade_id: u64,
    pub price: Price,
    pub quantity: Quantity,
    /// Execution time, Unix milliseconds
    pub event_time: i64,
    /// True when the buyer was the resting (maker) side
    pub is_buyer_maker: bool,
}

impl TradeEvent {
    /// Side of the book the aggressor traded against
    ///
    /// A buyer-maker print means a seller crossed into the bids.
    pub fn hit_side(&self) -> Side {
        if self.is_buyer_maker {
            Side::Bid
        } else {
            Side::Ask
        }
    }

    /// Trade value (price × quantity)
    pub fn notional(&self) -> Decimal {
        self.price.as_decimal() * self.quantity.as_decimal()
    }

    /// Execution time as a UTC timestamp, if representable
    pub fn executed_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.event_time).single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_trade(is_buyer_maker: bool) -> TradeEvent {
        TradeEvent {
            trade_id: 42,
            price: Price::from_str("50000.00").unwrap(),
            quantity: Quantity::from_str("0.5").unwrap(),
            event_time: 1_708_123_456_789,
            is_buyer_maker,
        }
    }

    #[test]
    fn test_hit_side() {
        assert_eq!(sample_trade(true).hit_side(), Side::Bid);
        assert_eq!(sample_trade(false).hit_side(), Side::Ask);
    }

    #[test]
    fn test_notional() {
        assert_eq!(sample_trade(false).notional(), Decimal::from(25000));
    }

    #[test]
    fn test_executed_at() {
        let at = sample_trade(false).executed_at().unwrap();
        assert_eq!(at.timestamp_millis(), 1_708_123_456_789);
    }
}

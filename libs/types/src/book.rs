//! Book side and price level types

use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy interest, best = highest price
    Bid,
    /// Sell interest, best = lowest price
    Ask,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Whether `a` sits closer to the top of this side than `b`
    pub fn is_better(&self, a: Price, b: Price) -> bool {
        match self {
            Side::Bid => a > b,
            Side::Ask => a < b,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

/// A `(price, quantity)` pair as carried by snapshots and deltas
///
/// A zero quantity in a delta means the level is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub quantity: Quantity,
}

impl PriceLevel {
    pub fn new(price: Price, quantity: Quantity) -> Self {
        Self { price, quantity }
    }

    /// Whether this level is a removal instruction
    pub fn is_removal(&self) -> bool {
        self.quantity.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert_eq!(Side::Ask.opposite(), Side::Bid);
    }

    #[test]
    fn test_side_is_better() {
        let low = Price::from_u64(100).unwrap();
        let high = Price::from_u64(101).unwrap();
        assert!(Side::Bid.is_better(high, low));
        assert!(Side::Ask.is_better(low, high));
        assert!(!Side::Ask.is_better(low, low));
    }

    #[test]
    fn test_price_level_removal() {
        let level = PriceLevel::new(
            Price::from_str("50000.00").unwrap(),
            Quantity::from_str("0").unwrap(),
        );
        assert!(level.is_removal());
    }

    #[test]
    fn test_side_serialization() {
        assert_eq!(serde_json::to_string(&Side::Bid).unwrap(), "\"bid\"");
    }
}

//! In-memory price level map for one side of the book
//!
//! Uses `BTreeMap` keyed by price so reads come out sorted without a
//! separate sort step. Bids are read highest-first, asks lowest-first.
//!
//! Invariant: a level with zero quantity never exists in the map. A zero
//! quantity on input is a removal instruction.
//!
//! The map holds no locks; its owner decides the concurrency discipline.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::book::{PriceLevel, Side};
use types::numeric::{Price, Quantity};

/// One row of a depth view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Price,
    pub quantity: Quantity,
    /// Running total from the best price outward, inclusive of this level.
    pub cumulative: Decimal,
}

/// Ordered price → quantity map for a single side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLevelMap {
    side: Side,
    levels: BTreeMap<Price, Quantity>,
}

impl PriceLevelMap {
    /// Create an empty map for the given side.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// Build a fresh map from snapshot levels.
    pub fn from_levels(side: Side, levels: &[PriceLevel]) -> Self {
        let mut map = Self::new(side);
        map.apply_batch(levels);
        map
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Insert or overwrite a level; zero quantity removes it.
    ///
    /// Returns the quantity previously resting at `price`, if any.
    pub fn upsert(&mut self, price: Price, quantity: Quantity) -> Option<Quantity> {
        if quantity.is_zero() {
            self.levels.remove(&price)
        } else {
            self.levels.insert(price, quantity)
        }
    }

    /// Apply levels in the order given; the last duplicate price wins.
    pub fn apply_batch(&mut self, levels: &[PriceLevel]) {
        for level in levels {
            self.upsert(level.price, level.quantity);
        }
    }

    /// Lazily produce up to `max_depth` levels, best first, with
    /// cumulative quantity.
    pub fn snapshot_view(&self, max_depth: usize) -> impl Iterator<Item = DepthLevel> + '_ {
        let ordered: Box<dyn Iterator<Item = (&Price, &Quantity)> + '_> = match self.side {
            Side::Bid => Box::new(self.levels.iter().rev()),
            Side::Ask => Box::new(self.levels.iter()),
        };

        ordered
            .take(max_depth)
            .scan(Decimal::ZERO, |running, (price, quantity)| {
                *running += quantity.as_decimal();
                Some(DepthLevel {
                    price: *price,
                    quantity: *quantity,
                    cumulative: *running,
                })
            })
    }

    /// Best level on this side.
    pub fn best(&self) -> Option<PriceLevel> {
        let entry = match self.side {
            Side::Bid => self.levels.iter().next_back(),
            Side::Ask => self.levels.iter().next(),
        };
        entry.map(|(price, quantity)| PriceLevel::new(*price, *quantity))
    }

    /// Quantity resting at `price`.
    pub fn get(&self, price: &Price) -> Option<Quantity> {
        self.levels.get(price).copied()
    }

    /// Number of price levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Sum of all resting quantity on this side.
    pub fn total_quantity(&self) -> Decimal {
        self.levels.values().map(|q| q.as_decimal()).sum()
    }
}

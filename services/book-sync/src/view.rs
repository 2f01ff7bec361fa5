//! Read-side view of the synchronised book
//!
//! A [`BookView`] is an immutable, depth-limited copy of both sides taken at
//! one instant. It carries a SHA-256 checksum over its levels so the sampler
//! can skip republishing an unchanged book and consumers can cheaply detect
//! change.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use types::ids::{Epoch, InstrumentId};
use types::numeric::Price;

use crate::order_book::{DepthLevel, PriceLevelMap};

/// Point-in-time depth view of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookView {
    pub instrument: InstrumentId,
    /// Engine generation the view was taken from.
    pub epoch: Epoch,
    /// Baseline sequence at sample time; `None` before the first sync.
    pub baseline_sequence: Option<u64>,
    /// Bids, best (highest) first.
    pub bids: Vec<DepthLevel>,
    /// Asks, best (lowest) first.
    pub asks: Vec<DepthLevel>,
    /// SHA-256 over the levels.
    pub checksum: String,
}

impl BookView {
    /// View with no levels, used before the first sync of an instrument.
    pub fn empty(instrument: InstrumentId, epoch: Epoch) -> Self {
        Self::from_levels(instrument, epoch, None, Vec::new(), Vec::new())
    }

    /// Sample both maps down to `max_depth` levels per side.
    pub fn capture(
        instrument: InstrumentId,
        epoch: Epoch,
        baseline_sequence: Option<u64>,
        bids: &PriceLevelMap,
        asks: &PriceLevelMap,
        max_depth: usize,
    ) -> Self {
        Self::from_levels(
            instrument,
            epoch,
            baseline_sequence,
            bids.snapshot_view(max_depth).collect(),
            asks.snapshot_view(max_depth).collect(),
        )
    }

    fn from_levels(
        instrument: InstrumentId,
        epoch: Epoch,
        baseline_sequence: Option<u64>,
        bids: Vec<DepthLevel>,
        asks: Vec<DepthLevel>,
    ) -> Self {
        let checksum = compute_checksum(&bids, &asks);
        Self {
            instrument,
            epoch,
            baseline_sequence,
            bids,
            asks,
            checksum,
        }
    }

    /// Copy limited to `max_depth` levels per side.
    ///
    /// Cumulative quantities are prefix sums, so truncation keeps them valid.
    pub fn truncated(&self, max_depth: usize) -> Self {
        if self.bids.len() <= max_depth && self.asks.len() <= max_depth {
            return self.clone();
        }
        Self::from_levels(
            self.instrument.clone(),
            self.epoch,
            self.baseline_sequence,
            self.bids.iter().take(max_depth).cloned().collect(),
            self.asks.iter().take(max_depth).cloned().collect(),
        )
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    /// Best ask minus best bid.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.as_decimal() - bid.as_decimal()),
            _ => None,
        }
    }

    /// Average of best bid and best ask.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => {
                Some((bid.as_decimal() + ask.as_decimal()) / Decimal::from(2))
            }
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Compute a SHA-256 checksum over both sides' levels.
///
/// Values are normalised first so `"100.10"` and `"100.1"` hash alike.
fn compute_checksum(bids: &[DepthLevel], asks: &[DepthLevel]) -> String {
    let mut hasher = Sha256::new();

    for level in bids {
        hasher.update(level.price.as_decimal().normalize().to_string().as_bytes());
        hasher.update(b":");
        hasher.update(level.quantity.as_decimal().normalize().to_string().as_bytes());
        hasher.update(b"|");
    }
    hasher.update(b"---");

    for level in asks {
        hasher.update(level.price.as_decimal().normalize().to_string().as_bytes());
        hasher.update(b":");
        hasher.update(level.quantity.as_decimal().normalize().to_string().as_bytes());
        hasher.update(b"|");
    }

    format!("{:x}", hasher.finalize())
}

/// Verify that a view's checksum matches its levels.
pub fn verify_view_integrity(view: &BookView) -> bool {
    view.checksum == compute_checksum(&view.bids, &view.asks)
}

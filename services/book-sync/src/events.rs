//! Event definitions consumed by the reconciliation engine
//!
//! These are the decoded, wire-independent forms of what the snapshot
//! source and the stream transport deliver. See `codec` for the wire
//! schema.

use serde::{Deserialize, Serialize};
use types::book::PriceLevel;
use types::trade::TradeEvent;

/// Point-in-time book state returned by the snapshot source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Last update id incorporated into these levels.
    pub baseline_sequence: u64,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

/// Incremental book change covering update ids
/// `[first_update_id, final_update_id]`, both inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaEvent {
    pub first_update_id: u64,
    pub final_update_id: u64,
    pub bid_changes: Vec<PriceLevel>,
    pub ask_changes: Vec<PriceLevel>,
}

impl DeltaEvent {
    /// Number of update ids folded into this event.
    pub fn span(&self) -> u64 {
        self.final_update_id
            .saturating_sub(self.first_update_id)
            .saturating_add(1)
    }

    /// Total level changes carried by this event.
    pub fn change_count(&self) -> usize {
        self.bid_changes.len() + self.ask_changes.len()
    }
}

/// A decoded frame from the stream transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "event", rename_all = "snake_case")]
pub enum StreamMessage {
    Delta(DeltaEvent),
    Trade(TradeEvent),
}

impl StreamMessage {
    /// Label for logging.
    pub fn kind_label(&self) -> &'static str {
        match self {
            StreamMessage::Delta(_) => "delta",
            StreamMessage::Trade(_) => "trade",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(first: u64, last: u64) -> DeltaEvent {
        DeltaEvent {
            first_update_id: first,
            final_update_id: last,
            bid_changes: Vec::new(),
            ask_changes: Vec::new(),
        }
    }

    #[test]
    fn test_delta_span() {
        assert_eq!(delta(101, 101).span(), 1);
        assert_eq!(delta(102, 105).span(), 4);
    }

    #[test]
    fn test_message_kind_label() {
        assert_eq!(StreamMessage::Delta(delta(1, 1)).kind_label(), "delta");
    }
}

//! Reconciliation tests for the book synchronisation engine
//!
//! Validates that the engine converges on the same book regardless of how
//! the snapshot and the delta stream interleave.
//!
//! Tests include:
//! - Buffered replay vs. live application equivalence
//! - Duplicate and re-delivered delta idempotence
//! - Gap detection after a lost delta
//! - Identical inputs produce identical views

use book_sync::engine::{DeltaOutcome, EngineState, ReconciliationEngine};
use book_sync::error::SyncError;
use book_sync::events::{DeltaEvent, Snapshot};
use book_sync::view::verify_view_integrity;
use proptest::prelude::*;
use types::book::PriceLevel;
use types::ids::{Epoch, InstrumentId};
use types::numeric::{Price, Quantity};

const DEPTH: usize = 1_000;

fn engine() -> ReconciliationEngine {
    ReconciliationEngine::new(InstrumentId::parse("BTCUSDT").unwrap(), Epoch::new(1), 10_000)
}

fn level(price: u64, qty: u64) -> PriceLevel {
    PriceLevel::new(Price::from_u64(price).unwrap(), Quantity::try_new(qty.into()).unwrap())
}

fn snapshot(baseline: u64) -> Snapshot {
    Snapshot {
        baseline_sequence: baseline,
        bids: (95..100).map(|p| level(p, 10)).collect(),
        asks: (101..106).map(|p| level(p, 10)).collect(),
    }
}

/// Contiguous deltas starting right after `baseline`.
fn contiguous(baseline: u64, spans: &[(u64, Vec<(bool, u64, u64)>)]) -> Vec<DeltaEvent> {
    let mut next = baseline + 1;
    spans
        .iter()
        .map(|(span, changes)| {
            let first = next;
            let last = first + span - 1;
            next = last + 1;
            let (bids, asks): (Vec<_>, Vec<_>) = changes.iter().partition(|(is_bid, _, _)| *is_bid);
            DeltaEvent {
                first_update_id: first,
                final_update_id: last,
                bid_changes: bids.iter().map(|(_, p, q)| level(*p, *q)).collect(),
                ask_changes: asks.iter().map(|(_, p, q)| level(*p, *q)).collect(),
            }
        })
        .collect()
}

fn live(baseline: u64, deltas: &[DeltaEvent]) -> ReconciliationEngine {
    let mut engine = engine();
    engine.apply_snapshot(snapshot(baseline)).unwrap();
    for delta in deltas {
        engine.on_delta(delta.clone()).unwrap();
    }
    engine
}

#[test]
fn test_snapshot_then_zero_quantity_removes_level() {
    let mut engine = engine();
    engine
        .apply_snapshot(Snapshot {
            baseline_sequence: 1000,
            bids: vec![level(100, 2)],
            asks: vec![level(101, 3)],
        })
        .unwrap();

    engine
        .on_delta(DeltaEvent {
            first_update_id: 1001,
            final_update_id: 1001,
            bid_changes: vec![level(100, 0)],
            ask_changes: vec![],
        })
        .unwrap();

    let view = engine.current_view(10);
    assert!(view.bids.is_empty());
    assert_eq!(view.best_ask(), Some(Price::from_u64(101).unwrap()));
    assert_eq!(view.baseline_sequence, Some(1001));

    let err = engine
        .on_delta(DeltaEvent {
            first_update_id: 1005,
            final_update_id: 1006,
            bid_changes: vec![],
            ask_changes: vec![],
        })
        .unwrap_err();
    assert!(matches!(err, SyncError::SequenceGap { baseline: 1001, first_update_id: 1005 }));
    assert_eq!(engine.state(), EngineState::Desynced);
}

#[test]
fn test_lost_delta_is_detected() {
    let deltas = contiguous(
        500,
        &[
            (2, vec![(true, 99, 1)]),
            (1, vec![(false, 101, 4)]),
            (3, vec![(true, 98, 0)]),
        ],
    );
    let mut engine = engine();
    engine.apply_snapshot(snapshot(500)).unwrap();

    engine.on_delta(deltas[0].clone()).unwrap();
    // deltas[1] lost in transit
    let err = engine.on_delta(deltas[2].clone()).unwrap_err();

    assert_eq!(
        err,
        SyncError::SequenceGap {
            baseline: 502,
            first_update_id: 504
        }
    );
}

#[test]
fn test_redelivered_stream_is_idempotent() {
    let deltas = contiguous(
        10,
        &[
            (1, vec![(true, 99, 7)]),
            (2, vec![(false, 103, 0), (false, 104, 2)]),
            (1, vec![(true, 97, 1)]),
        ],
    );
    let clean = live(10, &deltas);

    let mut noisy = engine();
    noisy.apply_snapshot(snapshot(10)).unwrap();
    for delta in &deltas {
        assert_eq!(noisy.on_delta(delta.clone()).unwrap(), DeltaOutcome::Applied);
    }
    for delta in &deltas {
        assert_eq!(noisy.on_delta(delta.clone()).unwrap(), DeltaOutcome::Stale);
    }

    assert_eq!(noisy.current_view(DEPTH), clean.current_view(DEPTH));
}

#[test]
fn test_identical_inputs_produce_identical_views() {
    let deltas = contiguous(
        0,
        &[(1, vec![(true, 99, 3)]), (4, vec![(false, 102, 9), (true, 96, 0)])],
    );
    let a = live(0, &deltas).current_view(DEPTH);
    let b = live(0, &deltas).current_view(DEPTH);

    assert_eq!(a.checksum, b.checksum);
    assert!(verify_view_integrity(&a));
}

fn spans_strategy() -> impl Strategy<Value = Vec<(u64, Vec<(bool, u64, u64)>)>> {
    prop::collection::vec(
        (
            1u64..4,
            prop::collection::vec((any::<bool>(), 90u64..110, 0u64..5), 0..4),
        ),
        1..30,
    )
}

proptest! {
    /// Buffering every delta before the snapshot and replaying converges on
    /// the same book as applying the snapshot first.
    #[test]
    fn prop_buffered_replay_matches_live(
        spans in spans_strategy(),
        split in 0usize..30,
        stale_prefix in 0usize..5,
    ) {
        let baseline = 1_000u64;
        let deltas = contiguous(baseline, &spans);
        let split = split.min(deltas.len());
        let expected = live(baseline, &deltas).current_view(DEPTH);

        // Older deltas the snapshot already covers, then the live ones.
        let mut engine = engine();
        for i in 0..stale_prefix as u64 {
            let id = baseline - 10 + i;
            engine.on_delta(DeltaEvent {
                first_update_id: id,
                final_update_id: id,
                bid_changes: vec![level(95, 1)],
                ask_changes: vec![],
            }).unwrap();
        }
        for delta in &deltas[..split] {
            prop_assert_eq!(engine.on_delta(delta.clone()).unwrap(), DeltaOutcome::Buffered);
        }

        let summary = engine.apply_snapshot(snapshot(baseline)).unwrap();
        prop_assert_eq!(summary.stale, stale_prefix);
        prop_assert_eq!(summary.applied, split);

        for delta in &deltas[split..] {
            prop_assert_eq!(engine.on_delta(delta.clone()).unwrap(), DeltaOutcome::Applied);
        }

        prop_assert_eq!(engine.current_view(DEPTH), expected);
    }

    /// Re-delivering any earlier delta never changes the book.
    #[test]
    fn prop_duplicates_never_mutate(
        spans in spans_strategy(),
        replay_index in 0usize..30,
    ) {
        let deltas = contiguous(0, &spans);
        let mut engine = live(0, &deltas);
        let before = engine.current_view(DEPTH);

        let duplicate = deltas[replay_index % deltas.len()].clone();
        prop_assert_eq!(engine.on_delta(duplicate).unwrap(), DeltaOutcome::Stale);
        prop_assert_eq!(engine.current_view(DEPTH), before);
    }
}

//! Reconciliation engine: snapshot + delta stream → consistent book
//!
//! State machine:
//!
//! ```text
//!  AwaitingSnapshot ──snapshot──▶ Buffering ──drained──▶ Synced
//!        │ (buffer deltas)            │ (replay via gate)   │ (gate each delta)
//!        └── overflow ──┐             └── gap ──┐           └── gap ──┐
//!                       ▼                       ▼                     ▼
//!                                    Desynced (terminal)
//! ```
//!
//! An engine instance is never revived: once `Desynced`, the owner builds a
//! new one with a new epoch. Every method takes `&mut self`, so the single
//! writer discipline is enforced by the borrow checker; the owner decides
//! which task that writer is.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::book::Side;
use types::ids::{Epoch, InstrumentId};

use crate::error::SyncError;
use crate::events::{DeltaEvent, Snapshot};
use crate::order_book::PriceLevelMap;
use crate::sequence::{GateDecision, SequenceGate};
use crate::view::BookView;

/// Lifecycle state of one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineState {
    /// No baseline yet; deltas are buffered.
    AwaitingSnapshot,
    /// Baseline known; buffered deltas are being replayed.
    Buffering,
    /// Live deltas go straight through the gate.
    Synced,
    /// Book correctness lost; this instance accepts nothing further.
    Desynced,
}

/// What happened to a single delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// Held until the snapshot arrives.
    Buffered,
    /// Changes applied; baseline advanced.
    Applied,
    /// Already covered by the baseline; dropped.
    Stale,
    /// Engine is desynced; delta discarded.
    Ignored,
}

/// Result of absorbing a snapshot and draining the pending buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Baseline taken from the snapshot.
    pub snapshot_sequence: u64,
    /// Buffered deltas that were applied.
    pub applied: usize,
    /// Buffered deltas dropped as stale.
    pub stale: usize,
    /// Baseline after the replay.
    pub baseline: u64,
}

/// Reconciles one instrument's snapshot with its delta stream.
#[derive(Debug)]
pub struct ReconciliationEngine {
    instrument: InstrumentId,
    epoch: Epoch,
    state: EngineState,
    /// `None` until a snapshot is absorbed.
    gate: Option<SequenceGate>,
    bids: PriceLevelMap,
    asks: PriceLevelMap,
    /// Deltas received before the snapshot, in arrival order.
    pending: VecDeque<DeltaEvent>,
    pending_capacity: usize,
    desync_cause: Option<SyncError>,
}

impl ReconciliationEngine {
    /// Create an engine awaiting its snapshot.
    pub fn new(instrument: InstrumentId, epoch: Epoch, pending_capacity: usize) -> Self {
        debug!(%instrument, %epoch, pending_capacity, "ReconciliationEngine created");
        Self {
            instrument,
            epoch,
            state: EngineState::AwaitingSnapshot,
            gate: None,
            bids: PriceLevelMap::new(Side::Bid),
            asks: PriceLevelMap::new(Side::Ask),
            pending: VecDeque::new(),
            pending_capacity,
            desync_cause: None,
        }
    }

    /// Feed one delta, in transport arrival order.
    ///
    /// Returns `Err(SyncError::SequenceGap)` (or `BufferOverflow`) exactly
    /// once, on the transition to `Desynced`.
    pub fn on_delta(&mut self, delta: DeltaEvent) -> Result<DeltaOutcome, SyncError> {
        match self.state {
            EngineState::AwaitingSnapshot => {
                if self.pending.len() >= self.pending_capacity {
                    let err = SyncError::BufferOverflow {
                        capacity: self.pending_capacity,
                    };
                    self.desync(err.clone());
                    return Err(err);
                }
                debug!(
                    epoch = %self.epoch,
                    first_update_id = delta.first_update_id,
                    final_update_id = delta.final_update_id,
                    pending = self.pending.len() + 1,
                    "Buffering delta until snapshot"
                );
                self.pending.push_back(delta);
                Ok(DeltaOutcome::Buffered)
            }
            EngineState::Synced => self.route(delta),
            EngineState::Desynced => Ok(DeltaOutcome::Ignored),
            EngineState::Buffering => Err(SyncError::InvalidState(
                "delta received while replaying the pending buffer".to_string(),
            )),
        }
    }

    /// Absorb the snapshot, then replay every buffered delta against it.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> Result<ReplaySummary, SyncError> {
        if self.state != EngineState::AwaitingSnapshot {
            return Err(SyncError::InvalidState(format!(
                "snapshot received in state {:?}",
                self.state
            )));
        }

        self.state = EngineState::Buffering;
        self.gate = Some(SequenceGate::new(snapshot.baseline_sequence));
        self.bids = PriceLevelMap::from_levels(Side::Bid, &snapshot.bids);
        self.asks = PriceLevelMap::from_levels(Side::Ask, &snapshot.asks);

        info!(
            instrument = %self.instrument,
            epoch = %self.epoch,
            baseline = snapshot.baseline_sequence,
            bid_levels = self.bids.len(),
            ask_levels = self.asks.len(),
            pending = self.pending.len(),
            "Snapshot absorbed, replaying buffered deltas"
        );

        let mut summary = ReplaySummary {
            snapshot_sequence: snapshot.baseline_sequence,
            applied: 0,
            stale: 0,
            baseline: snapshot.baseline_sequence,
        };

        let pending = std::mem::take(&mut self.pending);
        for delta in pending {
            match self.route(delta)? {
                DeltaOutcome::Applied => summary.applied += 1,
                DeltaOutcome::Stale => summary.stale += 1,
                DeltaOutcome::Buffered | DeltaOutcome::Ignored => {}
            }
        }

        summary.baseline = self.baseline().unwrap_or(snapshot.baseline_sequence);
        self.state = EngineState::Synced;

        info!(
            instrument = %self.instrument,
            epoch = %self.epoch,
            baseline = summary.baseline,
            replay_applied = summary.applied,
            replay_stale = summary.stale,
            "Engine synced"
        );

        Ok(summary)
    }

    /// Pass a delta through the gate and apply it if continuous.
    fn route(&mut self, delta: DeltaEvent) -> Result<DeltaOutcome, SyncError> {
        let gate = self.gate.as_mut().ok_or_else(|| {
            SyncError::InvalidState("delta routed before a baseline exists".to_string())
        })?;

        match gate.admit(&delta) {
            GateDecision::Stale => Ok(DeltaOutcome::Stale),
            GateDecision::Applicable => {
                self.bids.apply_batch(&delta.bid_changes);
                self.asks.apply_batch(&delta.ask_changes);
                Ok(DeltaOutcome::Applied)
            }
            GateDecision::Gap {
                baseline,
                first_update_id,
            } => {
                let err = SyncError::SequenceGap {
                    baseline,
                    first_update_id,
                };
                self.desync(err.clone());
                Err(err)
            }
        }
    }

    /// Enter the terminal state and drop everything that can no longer be
    /// trusted.
    fn desync(&mut self, cause: SyncError) {
        warn!(
            instrument = %self.instrument,
            epoch = %self.epoch,
            cause = %cause,
            "Engine desynced"
        );
        self.state = EngineState::Desynced;
        self.gate = None;
        self.bids = PriceLevelMap::new(Side::Bid);
        self.asks = PriceLevelMap::new(Side::Ask);
        self.pending.clear();
        self.desync_cause = Some(cause);
    }

    /// Depth view of the current book, `max_depth` levels per side.
    pub fn current_view(&self, max_depth: usize) -> BookView {
        BookView::capture(
            self.instrument.clone(),
            self.epoch,
            self.baseline(),
            &self.bids,
            &self.asks,
            max_depth,
        )
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Last update id incorporated; `None` before the snapshot.
    pub fn baseline(&self) -> Option<u64> {
        self.gate.as_ref().map(SequenceGate::baseline)
    }

    pub fn bids(&self) -> &PriceLevelMap {
        &self.bids
    }

    pub fn asks(&self) -> &PriceLevelMap {
        &self.asks
    }

    /// Deltas waiting for the snapshot.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_synced(&self) -> bool {
        self.state == EngineState::Synced
    }

    pub fn is_desynced(&self) -> bool {
        self.state == EngineState::Desynced
    }

    /// Why the engine desynced, if it has.
    pub fn desync_cause(&self) -> Option<&SyncError> {
        self.desync_cause.as_ref()
    }
}

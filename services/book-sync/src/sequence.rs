//! Sequence gate: continuity check between the baseline and each delta
//!
//! For a baseline `S` (last update id already incorporated) and a delta
//! covering `[U, u]`:
//! - `u <= S` → stale, already covered, drop without mutation
//! - `U <= S + 1` → applicable, no hole between `S` and the delta
//! - `U > S + 1` → gap, updates `S+1 ..= U-1` were never seen
//!
//! `U == S + 1` is applicable. A baseline of zero is an ordinary value.

use tracing::{debug, warn};

use crate::error::SyncError;
use crate::events::DeltaEvent;

/// Classification of a delta against the current baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Entirely covered by the baseline.
    Stale,
    /// Continuous with the baseline.
    Applicable,
    /// Lost updates between the baseline and this delta.
    Gap { baseline: u64, first_update_id: u64 },
}

impl GateDecision {
    /// Convert a gap into its error form.
    pub fn into_gap_error(self) -> Option<SyncError> {
        match self {
            GateDecision::Gap {
                baseline,
                first_update_id,
            } => Some(SyncError::SequenceGap {
                baseline,
                first_update_id,
            }),
            _ => None,
        }
    }
}

/// Tracks the baseline sequence and classifies incoming deltas.
///
/// Exists only once a snapshot has been absorbed; before that there is no
/// baseline at all, which the engine models as `Option<SequenceGate>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceGate {
    /// Last update id fully incorporated into the book.
    baseline: u64,
    /// Deltas admitted since creation.
    applied: u64,
    /// Stale deltas dropped since creation.
    stale: u64,
}

impl SequenceGate {
    /// Start gating from a snapshot's baseline sequence.
    pub fn new(baseline: u64) -> Self {
        Self {
            baseline,
            applied: 0,
            stale: 0,
        }
    }

    /// Classify a delta without changing any state.
    pub fn classify(&self, delta: &DeltaEvent) -> GateDecision {
        if delta.final_update_id <= self.baseline {
            return GateDecision::Stale;
        }

        if delta.first_update_id <= self.baseline.saturating_add(1) {
            GateDecision::Applicable
        } else {
            GateDecision::Gap {
                baseline: self.baseline,
                first_update_id: delta.first_update_id,
            }
        }
    }

    /// Classify a delta and record the outcome.
    ///
    /// On `Applicable` the caller must apply the delta's changes; the
    /// baseline has already advanced to `final_update_id`.
    pub fn admit(&mut self, delta: &DeltaEvent) -> GateDecision {
        let decision = self.classify(delta);
        match decision {
            GateDecision::Stale => {
                self.stale += 1;
                debug!(
                    baseline = self.baseline,
                    first_update_id = delta.first_update_id,
                    final_update_id = delta.final_update_id,
                    "Dropping stale delta"
                );
            }
            GateDecision::Applicable => {
                self.applied += 1;
                self.baseline = delta.final_update_id;
            }
            GateDecision::Gap { .. } => {
                warn!(
                    baseline = self.baseline,
                    first_update_id = delta.first_update_id,
                    missing = delta.first_update_id - self.baseline - 1,
                    "Sequence gap detected"
                );
            }
        }
        decision
    }

    /// Last update id incorporated into the book.
    pub fn baseline(&self) -> u64 {
        self.baseline
    }

    /// Total deltas admitted since creation.
    pub fn applied_count(&self) -> u64 {
        self.applied
    }

    /// Total stale deltas dropped since creation.
    pub fn stale_count(&self) -> u64 {
        self.stale
    }
}

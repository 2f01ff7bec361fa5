//! Counters for the synchronisation service
//!
//! Lock-free atomics shared between the writer task and any reader holding
//! a `BookHandle`. Counters are cumulative over the supervisor's lifetime,
//! across resyncs and instrument switches.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Core counters for the synchronisation service.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    // Delta processing
    pub deltas_applied: AtomicU64,
    pub deltas_stale: AtomicU64,
    pub deltas_buffered: AtomicU64,
    pub frames_malformed: AtomicU64,

    // Recovery
    pub gaps_detected: AtomicU64,
    pub resyncs: AtomicU64,
    pub snapshots_applied: AtomicU64,
    pub snapshot_failures: AtomicU64,
    pub transport_failures: AtomicU64,
    pub superseded_discarded: AtomicU64,

    // Trades and views
    pub trades_recorded: AtomicU64,
    pub views_published: AtomicU64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_applied(&self) {
        self.deltas_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.deltas_stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_buffered(&self) {
        self.deltas_buffered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.frames_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_gap(&self) {
        self.gaps_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resync(&self) {
        self.resyncs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_applied(&self) {
        self.snapshots_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_failure(&self) {
        self.snapshot_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_superseded(&self) {
        self.superseded_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trade(&self) {
        self.trades_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_view_published(&self) {
        self.views_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Plain copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            deltas_applied: self.deltas_applied.load(Ordering::Relaxed),
            deltas_stale: self.deltas_stale.load(Ordering::Relaxed),
            deltas_buffered: self.deltas_buffered.load(Ordering::Relaxed),
            frames_malformed: self.frames_malformed.load(Ordering::Relaxed),
            gaps_detected: self.gaps_detected.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            snapshots_applied: self.snapshots_applied.load(Ordering::Relaxed),
            snapshot_failures: self.snapshot_failures.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            superseded_discarded: self.superseded_discarded.load(Ordering::Relaxed),
            trades_recorded: self.trades_recorded.load(Ordering::Relaxed),
            views_published: self.views_published.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SyncMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub deltas_applied: u64,
    pub deltas_stale: u64,
    pub deltas_buffered: u64,
    pub frames_malformed: u64,
    pub gaps_detected: u64,
    pub resyncs: u64,
    pub snapshots_applied: u64,
    pub snapshot_failures: u64,
    pub transport_failures: u64,
    pub superseded_discarded: u64,
    pub trades_recorded: u64,
    pub views_published: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = SyncMetrics::new();
        metrics.record_applied();
        metrics.record_applied();
        metrics.record_stale();
        metrics.record_gap();
        metrics.record_resync();

        let snap = metrics.snapshot();
        assert_eq!(snap.deltas_applied, 2);
        assert_eq!(snap.deltas_stale, 1);
        assert_eq!(snap.gaps_detected, 1);
        assert_eq!(snap.resyncs, 1);
        assert_eq!(snap.snapshot_failures, 0);
    }
}

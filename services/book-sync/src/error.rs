//! Error taxonomy for the synchronisation service
//!
//! Stale deltas are not errors and never appear here. Everything below has
//! a defined recovery path owned by the supervisor; nothing is fatal.

use types::ids::Epoch;

/// Errors that can occur while keeping the local book in sync.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// A delta started beyond `baseline + 1`; updates were lost.
    #[error("sequence gap: baseline {baseline}, next delta starts at {first_update_id}")]
    SequenceGap { baseline: u64, first_update_id: u64 },

    #[error("snapshot fetch failed: {0}")]
    SnapshotFetch(String),

    #[error("transport failure: {0}")]
    Transport(String),

    /// A single frame could not be decoded; the frame is skipped.
    #[error("malformed message: {0}")]
    Decode(String),

    /// Something addressed to an engine that has since been replaced.
    #[error("superseded instance: message for epoch {received}, active epoch {active}")]
    Superseded { received: Epoch, active: Epoch },

    #[error("invalid engine state: {0}")]
    InvalidState(String),

    #[error("pending buffer overflow: capacity {capacity}")]
    BufferOverflow { capacity: usize },

    /// The supervisor task has exited; commands can no longer be delivered.
    #[error("supervisor stopped")]
    Stopped,
}

impl SyncError {
    /// Whether recovery should wait out a backoff delay first.
    ///
    /// Protocol-level desyncs restart immediately; failures talking to the
    /// upstream service back off.
    pub fn needs_backoff(&self) -> bool {
        matches!(self, SyncError::SnapshotFetch(_) | SyncError::Transport(_))
    }

    /// Whether the consumer should see `ConnectionStatus::Error`.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, SyncError::SnapshotFetch(_) | SyncError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gap_display() {
        let err = SyncError::SequenceGap {
            baseline: 1001,
            first_update_id: 1005,
        };
        assert_eq!(
            err.to_string(),
            "sequence gap: baseline 1001, next delta starts at 1005"
        );
    }

    #[test]
    fn test_backoff_classification() {
        assert!(!SyncError::SequenceGap {
            baseline: 1,
            first_update_id: 3
        }
        .needs_backoff());
        assert!(!SyncError::BufferOverflow { capacity: 10 }.needs_backoff());
        assert!(SyncError::SnapshotFetch("timeout".into()).needs_backoff());
        assert!(SyncError::Transport("closed".into()).needs_backoff());
    }

    #[test]
    fn test_user_visibility() {
        assert!(SyncError::SnapshotFetch("503".into()).is_user_visible());
        assert!(!SyncError::Superseded {
            received: Epoch::new(1),
            active: Epoch::new(2)
        }
        .is_user_visible());
    }
}

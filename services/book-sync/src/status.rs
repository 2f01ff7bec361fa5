//! Connection status as seen by consumers

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse health of the synchronised book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Not running: before start or after shutdown.
    #[default]
    Disconnected,
    /// A sync cycle is in progress; the book is not yet trustworthy.
    Connecting,
    /// Snapshot applied and deltas flowing through the gate.
    Connected,
    /// Last cycle failed talking to upstream; waiting to retry.
    Error,
}

impl ConnectionStatus {
    /// Whether the published view tracks the live book.
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_serde() {
        assert_eq!(ConnectionStatus::Connecting.to_string(), "connecting");
        assert_eq!(
            serde_json::to_string(&ConnectionStatus::Error).unwrap(),
            "\"error\""
        );
        assert!(ConnectionStatus::Connected.is_live());
        assert!(!ConnectionStatus::default().is_live());
    }
}

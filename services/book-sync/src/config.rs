//! Configuration for the synchronisation service
//!
//! All durations are carried as milliseconds so the structs deserialize
//! from plain JSON. Every field has a default; a config file only needs the
//! fields it wants to change.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry delay policy after transport or snapshot failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First delay after a failure.
    pub initial_delay_ms: u64,
    /// Upper bound for any delay.
    pub max_delay_ms: u64,
    /// Growth factor applied after each consecutive failure.
    pub multiplier: f64,
}

impl BackoffConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 2_000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

/// Configuration for the engine and its supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub backoff: BackoffConfig,
    /// Read-side sampling interval.
    pub view_interval_ms: u64,
    /// Levels per side kept in each sampled view; also the most any
    /// `BookHandle::current_view` call can return.
    pub publish_depth: usize,
    /// Number of recent trades retained.
    pub trade_capacity: usize,
    /// Hard cap on deltas buffered while awaiting a snapshot.
    pub pending_capacity: usize,
    /// Capacity of the supervisor command mailbox.
    pub command_buffer: usize,
}

impl SyncConfig {
    pub fn view_interval(&self) -> Duration {
        Duration::from_millis(self.view_interval_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            view_interval_ms: 200,
            publish_depth: 100,
            trade_capacity: 50,
            pending_capacity: 100_000,
            command_buffer: 32,
        }
    }
}

/// Endpoints and limits for the Binance adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinanceConfig {
    /// REST base, e.g. `https://api.binance.com`.
    pub rest_base_url: String,
    /// Combined-stream base, e.g. `wss://stream.binance.com:9443`.
    pub ws_base_url: String,
    /// Number of levels requested per side in the REST snapshot.
    pub snapshot_limit: u32,
    pub request_timeout_ms: u64,
}

impl BinanceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            rest_base_url: "https://api.binance.com".to_string(),
            ws_base_url: "wss://stream.binance.com:9443".to_string(),
            snapshot_limit: 1000,
            request_timeout_ms: 10_000,
        }
    }
}

/// Top-level file layout for the binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub sync: SyncConfig,
    pub binance: BinanceConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.view_interval(), Duration::from_millis(200));
        assert_eq!(config.trade_capacity, 50);
        assert_eq!(config.backoff.initial_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{"sync":{"backoff":{"max_delay_ms":5000}},"binance":{"snapshot_limit":500}}"#;
        let config: ServiceConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.sync.backoff.max_delay(), Duration::from_secs(5));
        assert_eq!(config.sync.backoff.initial_delay_ms, 2_000);
        assert_eq!(config.sync.publish_depth, 100);
        assert_eq!(config.binance.snapshot_limit, 500);
        assert_eq!(config.binance.rest_base_url, "https://api.binance.com");
    }
}

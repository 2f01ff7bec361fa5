//! Local Order Book Synchronisation Service
//!
//! Keeps a local replica of one instrument's order book consistent with an
//! upstream venue by combining:
//! - A point-in-time REST snapshot carrying a baseline sequence
//! - A stream of incremental deltas covering update-id ranges `[U, u]`
//! - A public trade stream
//!
//! Deltas that arrive before the snapshot are buffered and replayed. Every
//! delta passes a continuity gate; any gap makes the engine unusable and
//! the supervisor rebuilds it from a fresh snapshot.
//!
//! # Architecture
//!
//! ```text
//!   StreamConnector          SnapshotSource
//!        │ (deltas, trades)        │ (epoch-tagged)
//!        └──────────┬──────────────┘
//!              ┌────▼─────┐
//!              │Supervisor│  ← single writer, epochs, backoff, commands
//!              └────┬─────┘
//!        ┌──────────┼───────────┐
//!   ┌────▼───┐  ┌───▼───┐  ┌────▼────┐
//!   │ Engine │  │Trades │  │ Status  │
//!   │ + Gate │  │ Tape  │  │         │
//!   └────┬───┘  └───┬───┘  └────┬────┘
//!        │ (sampled)│           │
//!   ┌────▼──────────▼───────────▼──┐
//!   │    BookHandle (watch reads)   │
//!   └───────────────────────────────┘
//! ```

pub mod backoff;
pub mod binance;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod metrics;
pub mod order_book;
pub mod sequence;
pub mod source;
pub mod status;
pub mod supervisor;
pub mod trades;
pub mod view;

pub use config::{BackoffConfig, BinanceConfig, ServiceConfig, SyncConfig};
pub use engine::{DeltaOutcome, EngineState, ReconciliationEngine, ReplaySummary};
pub use error::SyncError;
pub use events::{DeltaEvent, Snapshot, StreamMessage};
pub use status::ConnectionStatus;
pub use supervisor::{spawn, BookHandle, Command};
pub use view::BookView;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";

//! Upstream boundaries: snapshot source and stream transport
//!
//! The supervisor only ever talks to these two traits. Concrete adapters
//! live in `binance`; tests substitute scripted fakes.

use async_trait::async_trait;
use futures::stream::BoxStream;
use types::ids::InstrumentId;

use crate::error::SyncError;
use crate::events::{Snapshot, StreamMessage};

/// Decoded messages from one transport connection, in arrival order.
///
/// `Err(SyncError::Decode)` items are skipped by the consumer. Any other
/// error, or the end of the stream, means the connection is gone.
pub type MessageStream = BoxStream<'static, Result<StreamMessage, SyncError>>;

/// Fetches a full book snapshot for one instrument.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self, instrument: &InstrumentId) -> Result<Snapshot, SyncError>;
}

/// Opens a delta and trade stream for one instrument.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, instrument: &InstrumentId) -> Result<MessageStream, SyncError>;
}

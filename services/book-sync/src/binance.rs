//! Binance spot adapters
//!
//! - [`BinanceSnapshotSource`]: `GET /api/v3/depth?symbol=..&limit=..`
//! - [`BinanceStreamConnector`]: combined stream
//!   `/stream?streams=<sym>@depth@100ms/<sym>@trade`

use async_trait::async_trait;
use futures::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info};
use types::ids::InstrumentId;

use crate::codec::{decode_frame, decode_snapshot};
use crate::config::BinanceConfig;
use crate::error::SyncError;
use crate::events::Snapshot;
use crate::source::{MessageStream, SnapshotSource, StreamConnector};

/// REST depth snapshot source.
#[derive(Debug, Clone)]
pub struct BinanceSnapshotSource {
    client: reqwest::Client,
    base_url: String,
    limit: u32,
}

impl BinanceSnapshotSource {
    pub fn new(config: &BinanceConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::SnapshotFetch(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.rest_base_url.trim_end_matches('/').to_string(),
            limit: config.snapshot_limit,
        })
    }
}

#[async_trait]
impl SnapshotSource for BinanceSnapshotSource {
    async fn fetch_snapshot(&self, instrument: &InstrumentId) -> Result<Snapshot, SyncError> {
        let url = format!("{}/api/v3/depth", self.base_url);
        let limit = self.limit.to_string();

        debug!(%instrument, %url, limit = self.limit, "Fetching depth snapshot");

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", instrument.as_str()), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| SyncError::SnapshotFetch(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::SnapshotFetch(format!(
                "depth snapshot request failed: HTTP {status}"
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| SyncError::SnapshotFetch(e.to_string()))?;
        let snapshot = decode_snapshot(&body)?;

        info!(
            %instrument,
            last_update_id = snapshot.baseline_sequence,
            bids = snapshot.bids.len(),
            asks = snapshot.asks.len(),
            "Depth snapshot received"
        );
        Ok(snapshot)
    }
}

/// WebSocket combined-stream connector.
#[derive(Debug, Clone)]
pub struct BinanceStreamConnector {
    base_url: String,
}

impl BinanceStreamConnector {
    pub fn new(config: &BinanceConfig) -> Self {
        Self {
            base_url: config.ws_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Combined-stream URL for one instrument's depth and trade streams.
    pub fn stream_url(&self, instrument: &InstrumentId) -> String {
        let name = instrument.stream_name();
        format!(
            "{}/stream?streams={name}@depth@100ms/{name}@trade",
            self.base_url
        )
    }
}

#[async_trait]
impl StreamConnector for BinanceStreamConnector {
    async fn connect(&self, instrument: &InstrumentId) -> Result<MessageStream, SyncError> {
        let url = self.stream_url(instrument);
        let (ws, resp) = connect_async(url.as_str())
            .await
            .map_err(|e| SyncError::Transport(format!("connect {url}: {e}")))?;

        info!(%instrument, status = %resp.status(), "Stream connected");

        let messages = ws
            .filter_map(|frame| async move {
                match frame {
                    Ok(Message::Text(text)) => decode_frame(&text).transpose(),
                    Ok(Message::Close(frame)) => Some(Err(SyncError::Transport(format!(
                        "closed by server: {frame:?}"
                    )))),
                    Ok(_) => None,
                    Err(e) => Some(Err(SyncError::Transport(e.to_string()))),
                }
            })
            .boxed();

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_url() {
        let connector = BinanceStreamConnector::new(&BinanceConfig {
            ws_base_url: "wss://stream.binance.com:9443/".to_string(),
            ..BinanceConfig::default()
        });
        let url = connector.stream_url(&InstrumentId::parse("BTCUSDT").unwrap());
        assert_eq!(
            url,
            "wss://stream.binance.com:9443/stream?streams=btcusdt@depth@100ms/btcusdt@trade"
        );
    }

    #[test]
    fn test_snapshot_source_builds() {
        let source = BinanceSnapshotSource::new(&BinanceConfig::default()).unwrap();
        assert_eq!(source.base_url, "https://api.binance.com");
        assert_eq!(source.limit, 1000);
    }
}

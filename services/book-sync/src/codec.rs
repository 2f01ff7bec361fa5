//! Binance wire format → engine events
//!
//! Stream frames arrive either wrapped in the combined-stream envelope
//! `{"stream": "...", "data": {...}}` or as the bare payload. Payloads are
//! dispatched on their `e` field:
//!
//! - `depthUpdate` → [`StreamMessage::Delta`] (`U`, `u`, `b`, `a`)
//! - `trade` → [`StreamMessage::Trade`] (`t`, `p`, `q`, `T`, `m`)
//!
//! Anything else (subscription acks, unknown event types) decodes to
//! `Ok(None)`. Levels are `[price, quantity]` string pairs.

use serde::Deserialize;
use serde_json::Value;
use types::book::PriceLevel;
use types::numeric::{Price, Quantity};
use types::trade::TradeEvent;

use crate::error::SyncError;
use crate::events::{DeltaEvent, Snapshot, StreamMessage};

type WireLevel = (String, String);

#[derive(Debug, Deserialize)]
struct DepthUpdateWire {
    #[serde(rename = "U")]
    first_update_id: u64,
    #[serde(rename = "u")]
    final_update_id: u64,
    #[serde(rename = "b", default)]
    bids: Vec<WireLevel>,
    #[serde(rename = "a", default)]
    asks: Vec<WireLevel>,
}

#[derive(Debug, Deserialize)]
struct TradeWire {
    #[serde(rename = "t")]
    trade_id: u64,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    quantity: String,
    #[serde(rename = "T")]
    trade_time: i64,
    #[serde(rename = "m")]
    is_buyer_maker: bool,
}

#[derive(Debug, Deserialize)]
struct SnapshotWire {
    #[serde(rename = "lastUpdateId")]
    last_update_id: u64,
    bids: Vec<WireLevel>,
    asks: Vec<WireLevel>,
}

/// Decode one text frame from the stream transport.
pub fn decode_frame(text: &str) -> Result<Option<StreamMessage>, SyncError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| SyncError::Decode(format!("invalid JSON: {e}")))?;

    let payload = match value {
        Value::Object(mut map) if map.contains_key("stream") && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };

    let event_type = payload.get("e").and_then(Value::as_str).map(str::to_owned);
    match event_type.as_deref() {
        Some("depthUpdate") => decode_depth_update(payload).map(|d| Some(StreamMessage::Delta(d))),
        Some("trade") => decode_trade(payload).map(|t| Some(StreamMessage::Trade(t))),
        _ => Ok(None),
    }
}

/// Decode the REST depth snapshot body.
pub fn decode_snapshot(body: &str) -> Result<Snapshot, SyncError> {
    let wire: SnapshotWire = serde_json::from_str(body)
        .map_err(|e| SyncError::SnapshotFetch(format!("invalid snapshot body: {e}")))?;

    Ok(Snapshot {
        baseline_sequence: wire.last_update_id,
        bids: convert_levels(&wire.bids).map_err(|e| SyncError::SnapshotFetch(e.to_string()))?,
        asks: convert_levels(&wire.asks).map_err(|e| SyncError::SnapshotFetch(e.to_string()))?,
    })
}

fn decode_depth_update(payload: Value) -> Result<DeltaEvent, SyncError> {
    let wire: DepthUpdateWire = serde_json::from_value(payload)
        .map_err(|e| SyncError::Decode(format!("depthUpdate: {e}")))?;

    if wire.first_update_id > wire.final_update_id {
        return Err(SyncError::Decode(format!(
            "depthUpdate range inverted: U={} > u={}",
            wire.first_update_id, wire.final_update_id
        )));
    }

    Ok(DeltaEvent {
        first_update_id: wire.first_update_id,
        final_update_id: wire.final_update_id,
        bid_changes: convert_levels(&wire.bids)?,
        ask_changes: convert_levels(&wire.asks)?,
    })
}

fn decode_trade(payload: Value) -> Result<TradeEvent, SyncError> {
    let wire: TradeWire =
        serde_json::from_value(payload).map_err(|e| SyncError::Decode(format!("trade: {e}")))?;

    Ok(TradeEvent {
        trade_id: wire.trade_id,
        price: wire
            .price
            .parse::<Price>()
            .map_err(|e| SyncError::Decode(e.to_string()))?,
        quantity: wire
            .quantity
            .parse::<Quantity>()
            .map_err(|e| SyncError::Decode(e.to_string()))?,
        event_time: wire.trade_time,
        is_buyer_maker: wire.is_buyer_maker,
    })
}

fn convert_levels(levels: &[WireLevel]) -> Result<Vec<PriceLevel>, SyncError> {
    levels
        .iter()
        .map(|(price, qty)| {
            let price = price
                .parse::<Price>()
                .map_err(|e| SyncError::Decode(e.to_string()))?;
            let quantity = qty
                .parse::<Quantity>()
                .map_err(|e| SyncError::Decode(e.to_string()))?;
            Ok(PriceLevel::new(price, quantity))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const DEPTH: &str = r#"{"e":"depthUpdate","E":1708123456789,"s":"BTCUSDT","U":157,"u":160,"b":[["0.0024","10"]],"a":[["0.0026","100"],["0.0027","0.00000000"]]}"#;

    #[test]
    fn test_decode_bare_depth_update() {
        let msg = decode_frame(DEPTH).unwrap().unwrap();
        let StreamMessage::Delta(delta) = msg else {
            panic!("expected delta");
        };

        assert_eq!(delta.first_update_id, 157);
        assert_eq!(delta.final_update_id, 160);
        assert_eq!(delta.bid_changes.len(), 1);
        assert_eq!(delta.ask_changes.len(), 2);
        assert!(delta.ask_changes[1].is_removal());
        assert_eq!(delta.bid_changes[0].price, Price::from_str("0.0024").unwrap());
    }

    #[test]
    fn test_decode_combined_envelope() {
        let framed = format!(r#"{{"stream":"btcusdt@depth@100ms","data":{DEPTH}}}"#);
        let msg = decode_frame(&framed).unwrap().unwrap();
        assert_eq!(msg.kind_label(), "delta");
    }

    #[test]
    fn test_decode_trade() {
        let text = r#"{"stream":"btcusdt@trade","data":{"e":"trade","E":1708123456790,"s":"BTCUSDT","t":12345,"p":"50000.10","q":"0.25","T":1708123456789,"m":true}}"#;
        let Some(StreamMessage::Trade(trade)) = decode_frame(text).unwrap() else {
            panic!("expected trade");
        };

        assert_eq!(trade.trade_id, 12345);
        assert_eq!(trade.event_time, 1_708_123_456_789);
        assert!(trade.is_buyer_maker);
        assert_eq!(trade.quantity, Quantity::from_str("0.25").unwrap());
    }

    #[test]
    fn test_subscription_ack_is_ignored() {
        assert_eq!(decode_frame(r#"{"result":null,"id":1}"#).unwrap(), None);
        assert_eq!(decode_frame(r#"{"e":"kline","k":{}}"#).unwrap(), None);
    }

    #[test]
    fn test_malformed_frames() {
        assert!(matches!(decode_frame("not json"), Err(SyncError::Decode(_))));

        let inverted = r#"{"e":"depthUpdate","U":10,"u":9,"b":[],"a":[]}"#;
        assert!(matches!(decode_frame(inverted), Err(SyncError::Decode(_))));

        let bad_qty = r#"{"e":"depthUpdate","U":1,"u":1,"b":[["1.0","-5"]],"a":[]}"#;
        assert!(matches!(decode_frame(bad_qty), Err(SyncError::Decode(_))));
    }

    #[test]
    fn test_decode_snapshot() {
        let body = r#"{"lastUpdateId":1027024,"bids":[["4.00000000","431.00000000"]],"asks":[["4.00000200","12.00000000"]]}"#;
        let snapshot = decode_snapshot(body).unwrap();

        assert_eq!(snapshot.baseline_sequence, 1_027_024);
        assert_eq!(snapshot.bids[0].quantity, Quantity::from_str("431").unwrap());
        assert_eq!(snapshot.asks.len(), 1);
    }

    #[test]
    fn test_bad_snapshot_is_fetch_error() {
        assert!(matches!(
            decode_snapshot(r#"{"code":-1121,"msg":"Invalid symbol."}"#),
            Err(SyncError::SnapshotFetch(_))
        ));
    }
}

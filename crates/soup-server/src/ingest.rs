//! The ingestion loop: raw frames in, journal rows and live events out.

use soup_aprs::{decode, FrameClass};
use soup_bus::EventBus;
use soup_core::{now_ms, LiveEvent, Message, StationPosition};
use soup_store::Store;
use soup_telemetry::Metrics;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Consume de-framed AX.25 frames until the channel closes.
///
/// A frame that fails to decode, or decodes to something out of scope,
/// is dropped and never stops the loop. A failed journal append is
/// logged and counted, but the event is still published so the live
/// view stays current.
pub async fn run_ingest(
    mut frame_rx: mpsc::Receiver<Vec<u8>>,
    store: Arc<Store>,
    bus: EventBus,
    publish_messages: bool,
) {
    info!(publish_messages, "Ingestion loop started");
    while let Some(raw) = frame_rx.recv().await {
        Metrics::record_frame_received();

        let record = match decode(&raw) {
            Ok(record) => record,
            Err(e) => {
                Metrics::record_decode_error();
                debug!(error = %e, len = raw.len(), "Dropping undecodable frame");
                continue;
            }
        };

        match record.classify() {
            FrameClass::Position { callsign, lat, lon } => {
                let pos = StationPosition::observed(callsign, lat, lon, now_ms());
                match store.record_position(&pos) {
                    Ok(()) => Metrics::record_position_row(),
                    Err(e) => {
                        Metrics::record_store_write_error("positions");
                        error!(error = %e, callsign = %pos.callsign, "Position append failed");
                    }
                }
                bus.publish(LiveEvent::Position(pos));
            }
            FrameClass::Message {
                sender,
                recipient,
                body,
            } => {
                let msg = Message {
                    sender,
                    recipient,
                    info: body,
                    timestamp_ms: now_ms(),
                };
                match store.record_message(&msg) {
                    Ok(()) => Metrics::record_message_row(),
                    Err(e) => {
                        Metrics::record_store_write_error("messages");
                        error!(error = %e, sender = %msg.sender, "Message append failed");
                    }
                }
                if publish_messages {
                    bus.publish(LiveEvent::Message(msg));
                }
            }
            FrameClass::Other => {
                debug!("Ignoring out-of-scope frame");
            }
        }
    }
    info!("Ingestion loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use soup_aprs::encode_ui;
    use tempfile::TempDir;

    fn position_frame() -> Vec<u8> {
        encode_ui("APRS", "N0CALL-9", &["WIDE2-2"], b"!4740.12N/12219.45W>test")
            .unwrap()
    }

    fn message_frame() -> Vec<u8> {
        encode_ui("APRS", "N0CALL", &[], b":K7ABC    :hello there{42").unwrap()
    }

    #[tokio::test]
    async fn test_position_frame_journaled_and_published() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        let bus = EventBus::new();
        let mut sub = bus.subscribe();

        let (tx, rx) = mpsc::channel(8);
        tx.send(position_frame()).await.unwrap();
        drop(tx);
        run_ingest(rx, store.clone(), bus, false).await;

        let latest = store.latest_positions().unwrap();
        assert_eq!(latest.len(), 1);
        assert!(latest.contains_key("N0CALL-9"));

        match sub.rx.recv().await.unwrap() {
            LiveEvent::Position(p) => {
                assert_eq!(p.callsign, "N0CALL-9");
                assert_eq!(p.ssid, "9");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_message_frame_journaled_not_published_by_default() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        let bus = EventBus::new();
        let mut sub = bus.subscribe();

        let (tx, rx) = mpsc::channel(8);
        tx.send(message_frame()).await.unwrap();
        drop(tx);
        run_ingest(rx, store.clone(), bus, false).await;

        let recent = store.recent_messages(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].recipient, "K7ABC");
        assert_eq!(recent[0].info, "hello there");

        assert!(sub.rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_message_frame_published_when_enabled() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        let bus = EventBus::new();
        let mut sub = bus.subscribe();

        let (tx, rx) = mpsc::channel(8);
        tx.send(message_frame()).await.unwrap();
        drop(tx);
        run_ingest(rx, store, bus, true).await;

        match sub.rx.recv().await.unwrap() {
            LiveEvent::Message(m) => assert_eq!(m.sender, "N0CALL"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_garbage_frame_does_not_stop_loop() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        let bus = EventBus::new();

        let (tx, rx) = mpsc::channel(8);
        tx.send(vec![0x01, 0x02, 0x03]).await.unwrap();
        tx.send(position_frame()).await.unwrap();
        drop(tx);
        run_ingest(rx, store.clone(), bus, false).await;

        assert_eq!(store.latest_positions().unwrap().len(), 1);
    }
}

//! End-to-end pipeline tests against a mock KISS TNC.
//!
//! Covers both directions:
//! - inbound: TNC bytes -> link -> ingest -> store + live event
//! - outbound: HTTP send_message -> link -> TNC bytes

use axum::body::Body;
use axum::http::{Request, StatusCode};
use soup_aprs::{ax25, encode_ui};
use soup_bus::EventBus;
use soup_core::LiveEvent;
use soup_link::{kiss, LinkConfig, LinkManager};
use soup_server::ingest::run_ingest;
use soup_server::{AppConfig, Application};
use soup_store::Store;
use soup_web::{create_router, AppState, WebConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tower::ServiceExt;

fn test_link_config(port: u16) -> LinkConfig {
    LinkConfig {
        host: "127.0.0.1".to_string(),
        port,
        reconnect_delay: Duration::from_millis(50),
        connect_timeout: Duration::from_secs(1),
    }
}

#[tokio::test]
async fn test_inbound_frame_reaches_store_and_subscriber() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let bus = EventBus::new();
    let mut sub = bus.subscribe();

    let (frame_tx, frame_rx) = mpsc::channel(64);
    let manager = LinkManager::new(test_link_config(port), frame_tx);
    let shutdown = manager.shutdown_token();
    let link_task = tokio::spawn(async move { manager.run().await });
    let ingest_task = tokio::spawn(run_ingest(frame_rx, store.clone(), bus.clone(), false));

    let (mut socket, _) = listener.accept().await.unwrap();
    let frame = encode_ui(
        "APRS",
        "N0CALL-9",
        &["WIDE2-2"],
        b"!4740.12N/12219.45W>mobile",
    )
    .unwrap();
    socket.write_all(&kiss::escape(&frame)).await.unwrap();

    let event = timeout(Duration::from_secs(2), sub.rx.recv())
        .await
        .expect("live event within timeout")
        .expect("bus still open");
    match event {
        LiveEvent::Position(p) => {
            assert_eq!(p.callsign, "N0CALL-9");
            assert!((p.lat - 47.668_666).abs() < 1e-3);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    assert!(store
        .latest_positions()
        .unwrap()
        .contains_key("N0CALL-9"));

    shutdown.cancel();
    let _ = link_task.await;
    let _ = timeout(Duration::from_secs(1), ingest_task).await;
}

#[tokio::test]
async fn test_send_message_reaches_tnc() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let bus = EventBus::new();

    let (frame_tx, _frame_rx) = mpsc::channel(64);
    let manager = LinkManager::new(test_link_config(port), frame_tx);
    let handle = manager.handle();
    let shutdown = manager.shutdown_token();
    let link_task = tokio::spawn(async move { manager.run().await });

    let (mut socket, _) = listener.accept().await.unwrap();
    // Give the manager a moment to fill the write slot.
    timeout(Duration::from_secs(2), async {
        while !handle.is_connected() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("link connects within timeout");

    let app = create_router(AppState::new(
        store,
        bus,
        handle,
        "N0CALL".to_string(),
        "WIDE2-2".to_string(),
        WebConfig::default(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/send_message")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("destination=K7ABC&message=hello"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut buf = [0u8; 512];
    let n = timeout(Duration::from_secs(2), socket.read(&mut buf))
        .await
        .expect("TNC receives bytes")
        .unwrap();
    let mut decoder = kiss::FrameDecoder::new();
    let frames = decoder.feed(&buf[..n]);
    assert_eq!(frames.len(), 1);

    let frame = ax25::parse_frame(&frames[0]).unwrap();
    assert!(frame.is_ui());
    assert_eq!(frame.destination.callsign(), "K7ABC");
    assert_eq!(frame.source.callsign(), "N0CALL");
    assert_eq!(frame.info, b">hello");

    shutdown.cancel();
    let _ = link_task.await;
}

#[tokio::test]
async fn test_run_surfaces_web_bind_failure() {
    // Occupy the web port so the server cannot bind.
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.web.port = port;
    config.persistence.data_dir = dir.path().to_path_buf();
    // Nothing listens here; the link loop just retries until shutdown.
    config.kiss.host = "127.0.0.1".to_string();
    config.kiss.port = 1;
    config.kiss.reconnect_delay_secs = 1;

    let result = timeout(Duration::from_secs(5), Application::new(config).run())
        .await
        .expect("run returns after the bind failure");
    assert!(result.is_err());
}

//! Axum router, handlers, and the live SSE stream.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Json};
use axum::routing::{get, post};
use axum::{Form, Router};
use futures_util::stream::Stream;
use serde::Deserialize;
use soup_aprs::ax25::encode_ui;
use soup_bus::EventBus;
use soup_core::{now_ms, PositionRange, StationPosition};
use soup_link::{LinkError, LinkHandle};
use soup_store::Store;
use soup_telemetry::Metrics;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::WebConfig;
use crate::error::ApiError;

const DEFAULT_MESSAGE_LIMIT: usize = 50;

/// Caps concurrent live-stream connections.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(ConnectionGuard {
                    limiter: Arc::clone(self),
                });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

/// Releases the connection slot when the stream is dropped.
pub struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    bus: EventBus,
    link: LinkHandle,
    mycall: String,
    digi_path: String,
    limiter: Arc<ConnectionLimiter>,
    config: WebConfig,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        bus: EventBus,
        link: LinkHandle,
        mycall: String,
        digi_path: String,
        config: WebConfig,
    ) -> Self {
        Self {
            store,
            bus,
            link,
            mycall,
            digi_path,
            limiter: Arc::new(ConnectionLimiter::new(config.max_stream_connections)),
            config,
        }
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/positions.json", get(get_positions))
        .route("/messages.json", get(get_messages))
        .route("/stream", get(stream_events))
        .route("/send_message", post(send_message))
        .route("/metrics", get(get_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the index HTML page.
async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

#[derive(Debug, Deserialize)]
struct PositionsQuery {
    range: Option<String>,
}

/// Latest position per callsign, optionally restricted to a time window.
async fn get_positions(
    State(state): State<AppState>,
    Query(query): Query<PositionsQuery>,
) -> Result<Json<HashMap<String, StationPosition>>, ApiError> {
    let range: PositionRange = match query.range.as_deref() {
        None => PositionRange::Realtime,
        Some(s) => s
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Unknown range: {s}")))?,
    };

    let positions = match range.cutoff_ms(now_ms()) {
        Some(cutoff) => state.store.positions_since(cutoff)?,
        None => state.store.latest_positions()?,
    };
    Ok(Json(positions))
}

#[derive(Debug, Deserialize)]
struct MessagesQuery {
    limit: Option<usize>,
}

/// Recent messages, newest first.
async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<soup_core::Message>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT);
    Ok(Json(state.store.recent_messages(limit)?))
}

/// Removes the bus subscriber when the stream is dropped.
struct SubscriptionGuard {
    bus: EventBus,
    id: u64,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

struct LiveStream {
    rx: UnboundedReceiver<soup_core::LiveEvent>,
    _subscription: SubscriptionGuard,
    _connection: ConnectionGuard,
}

/// Live event stream over Server-Sent Events.
///
/// Each subscriber gets every event published after it connects, in
/// publish order. The guards deregister the subscriber and release the
/// connection slot when the client goes away.
async fn stream_events(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let connection = state.limiter.try_acquire().ok_or_else(|| {
        warn!(
            current = state.limiter.current_count(),
            max = state.config.max_stream_connections,
            "Live stream connection limit reached"
        );
        ApiError::TooManyStreams
    })?;

    let subscription = state.bus.subscribe();
    info!(
        id = subscription.id,
        connections = state.limiter.current_count(),
        "Live stream connected"
    );

    let live = LiveStream {
        rx: subscription.rx,
        _subscription: SubscriptionGuard {
            bus: state.bus.clone(),
            id: subscription.id,
        },
        _connection: connection,
    };

    let stream = futures_util::stream::unfold(live, |mut live| async move {
        loop {
            let event = live.rx.recv().await?;
            // Serializing domain types cannot fail; skip rather than
            // tear down the stream if it somehow does.
            match Event::default().json_data(&event) {
                Ok(sse_event) => return Some((Ok(sse_event), live)),
                Err(_) => continue,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[derive(Debug, Deserialize)]
struct SendMessageForm {
    destination: String,
    message: String,
}

/// Encode a UI frame carrying `message` and write it to the TNC.
async fn send_message(
    State(state): State<AppState>,
    Form(form): Form<SendMessageForm>,
) -> Result<impl IntoResponse, ApiError> {
    let destination = form.destination.trim();
    let message = form.message.trim();
    if destination.is_empty() || message.is_empty() {
        return Err(ApiError::BadRequest(
            "destination and message are required".to_string(),
        ));
    }

    let info = format!(">{message}");
    let frame = encode_ui(
        destination,
        &state.mycall,
        &[state.digi_path.as_str()],
        info.as_bytes(),
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.link.send(&frame).await.map_err(|e| match e {
        LinkError::NotConnected => ApiError::NotConnected,
        other => ApiError::LinkIo(other.to_string()),
    })?;

    info!(destination, len = message.len(), "Message sent");
    Ok((StatusCode::OK, Json(serde_json::json!({ "status": "sent" }))))
}

/// Prometheus text exposition.
async fn get_metrics() -> String {
    Metrics::gather()
}

/// Run the HTTP server until the shutdown token fires.
pub async fn run_server(state: AppState, shutdown: CancellationToken) -> std::io::Result<()> {
    let port = state.config.port;
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Starting web server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

//! Prometheus metrics for the ingestion pipeline and link.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally: a registration
//! failure means duplicate metric names, a fatal configuration error
//! that should crash at startup. These panics only occur during static
//! initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

/// KISS link connection state (1 = connected).
pub static LINK_CONNECTED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("soup_link_connected", "KISS link state (1=connected)").unwrap()
});

/// Total link reconnect attempts.
pub static LINK_RECONNECTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "soup_link_reconnects_total",
        "Total KISS link reconnect attempts"
    )
    .unwrap()
});

/// Raw frames received from the link.
pub static FRAMES_RECEIVED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "soup_frames_received_total",
        "Raw AX.25 frames received from the KISS link"
    )
    .unwrap()
});

/// Frames written to the link (outbound sends).
pub static FRAMES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "soup_frames_sent_total",
        "AX.25 frames written to the KISS link"
    )
    .unwrap()
});

/// Frames that failed to decode.
pub static DECODE_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "soup_decode_errors_total",
        "Frames dropped due to decode failure"
    )
    .unwrap()
});

/// Rows appended, by table.
pub static ROWS_RECORDED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "soup_rows_recorded_total",
        "Rows appended to the store",
        &["table"]
    )
    .unwrap()
});

/// Store write failures, by table.
pub static STORE_WRITE_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "soup_store_write_errors_total",
        "Store append failures (events still published live)",
        &["table"]
    )
    .unwrap()
});

/// Currently registered live-stream subscribers.
pub static LIVE_SUBSCRIBERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "soup_live_subscribers",
        "Currently registered live-stream subscribers"
    )
    .unwrap()
});

/// Facade over the metric statics.
pub struct Metrics;

impl Metrics {
    pub fn set_link_connected(connected: bool) {
        LINK_CONNECTED.set(i64::from(connected));
    }

    pub fn record_reconnect() {
        LINK_RECONNECTS_TOTAL.inc();
    }

    pub fn record_frame_received() {
        FRAMES_RECEIVED_TOTAL.inc();
    }

    pub fn record_frame_sent() {
        FRAMES_SENT_TOTAL.inc();
    }

    pub fn record_decode_error() {
        DECODE_ERRORS_TOTAL.inc();
    }

    pub fn record_position_row() {
        ROWS_RECORDED_TOTAL.with_label_values(&["positions"]).inc();
    }

    pub fn record_message_row() {
        ROWS_RECORDED_TOTAL.with_label_values(&["messages"]).inc();
    }

    pub fn record_store_write_error(table: &str) {
        STORE_WRITE_ERRORS_TOTAL.with_label_values(&[table]).inc();
    }

    pub fn set_live_subscribers(count: usize) {
        LIVE_SUBSCRIBERS.set(count as i64);
    }

    /// Render all registered metrics in the text exposition format.
    pub fn gather() -> String {
        let metric_families = prometheus::gather();
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&metric_families, &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

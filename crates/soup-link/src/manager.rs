//! TCP link manager with automatic reconnection.
//!
//! One task owns the connect-read-reconnect loop; everything else talks
//! to the link through a clonable [`LinkHandle`]. The current write half
//! lives in a shared slot that the manager fills on connect and clears on
//! any error, so a send can never observe a half-initialized connection.

use crate::error::{LinkError, LinkResult};
use crate::kiss;
use parking_lot::RwLock;
use soup_telemetry::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Link configuration.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// KISS TNC host.
    pub host: String,
    /// KISS TNC TCP port.
    pub port: u16,
    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,
    /// Per-attempt connect timeout.
    pub connect_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8001,
            reconnect_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Link state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

type WriterSlot = Arc<TokioMutex<Option<OwnedWriteHalf>>>;

/// Owns the single connection to the KISS TNC.
pub struct LinkManager {
    config: LinkConfig,
    state: Arc<RwLock<LinkState>>,
    writer: WriterSlot,
    frame_tx: mpsc::Sender<Vec<u8>>,
    shutdown: CancellationToken,
}

impl LinkManager {
    /// Create a new link manager. De-framed AX.25 frames are delivered
    /// on `frame_tx`.
    pub fn new(config: LinkConfig, frame_tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(LinkState::Disconnected)),
            writer: Arc::new(TokioMutex::new(None)),
            frame_tx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Get a send handle. Clonable and safe to use concurrently with the
    /// reconnect loop.
    pub fn handle(&self) -> LinkHandle {
        LinkHandle {
            writer: self.writer.clone(),
            state: self.state.clone(),
        }
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        *self.state.read()
    }

    /// Signal graceful shutdown of the connect loop.
    pub fn shutdown(&self) {
        info!("Link manager shutdown requested");
        self.shutdown.cancel();
    }

    /// Token cancelled when `shutdown` is called.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the connect-read-reconnect loop until shutdown.
    ///
    /// There is no terminal state short of shutdown: any session error
    /// transitions back to Disconnected and retries after the fixed
    /// backoff.
    pub async fn run(&self) {
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            *self.state.write() = LinkState::Connecting;
            match self.run_session().await {
                Ok(()) => info!("KISS link closed"),
                Err(e) => warn!(error = %e, "KISS link error"),
            }
            *self.state.write() = LinkState::Disconnected;
            Metrics::set_link_connected(false);

            // Ingestion side went away; nothing left to feed.
            if self.frame_tx.is_closed() {
                warn!("Frame receiver dropped, stopping link manager");
                break;
            }
            if self.shutdown.is_cancelled() {
                break;
            }

            Metrics::record_reconnect();
            debug!(delay = ?self.config.reconnect_delay, "Reconnecting after backoff");
            tokio::select! {
                () = tokio::time::sleep(self.config.reconnect_delay) => {}
                () = self.shutdown.cancelled() => break,
            }
        }
        *self.state.write() = LinkState::Disconnected;
        Metrics::set_link_connected(false);
    }

    /// One connection attempt plus its read loop.
    async fn run_session(&self) -> LinkResult<()> {
        let addr = (self.config.host.as_str(), self.config.port);
        info!(host = %self.config.host, port = self.config.port, "Connecting to KISS TNC");

        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| LinkError::ConnectTimeout)??;
        stream.set_nodelay(true)?;
        let (mut read_half, write_half) = stream.into_split();

        *self.writer.lock().await = Some(write_half);
        *self.state.write() = LinkState::Connected;
        Metrics::set_link_connected(true);
        info!("KISS link established");

        let mut decoder = kiss::FrameDecoder::new();
        let mut buf = [0u8; 4096];
        let result = loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("Shutdown signal received in read loop");
                    break Ok(());
                }
                read = read_half.read(&mut buf) => match read {
                    Ok(0) => break Err(LinkError::Closed),
                    Ok(n) => {
                        let mut receiver_gone = false;
                        for frame in decoder.feed(&buf[..n]) {
                            if self.frame_tx.send(frame).await.is_err() {
                                receiver_gone = true;
                                break;
                            }
                        }
                        if receiver_gone {
                            break Ok(());
                        }
                    }
                    Err(e) => break Err(LinkError::Io(e)),
                }
            }
        };

        // Clear the slot before reporting: no send may use a dead handle.
        self.writer.lock().await.take();
        result
    }
}

/// Clonable handle for outbound sends.
#[derive(Clone)]
pub struct LinkHandle {
    writer: WriterSlot,
    state: Arc<RwLock<LinkState>>,
}

impl LinkHandle {
    /// Current link state.
    pub fn state(&self) -> LinkState {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// KISS-wrap `frame` and write it to the TNC.
    ///
    /// Fails with `NotConnected` when no live connection exists and `Io`
    /// on transport failure; the connection slot is cleared on failure so
    /// subsequent sends fail fast while the reconnect loop recovers.
    pub async fn send(&self, frame: &[u8]) -> LinkResult<()> {
        let wire = kiss::escape(frame);
        let mut slot = self.writer.lock().await;
        let Some(writer) = slot.as_mut() else {
            return Err(LinkError::NotConnected);
        };
        match writer.write_all(&wire).await {
            Ok(()) => {
                Metrics::record_frame_sent();
                Ok(())
            }
            Err(e) => {
                slot.take();
                *self.state.write() = LinkState::Disconnected;
                Metrics::set_link_connected(false);
                Err(LinkError::Io(e))
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn disconnected_for_test() -> Self {
        Self {
            writer: Arc::new(TokioMutex::new(None)),
            state: Arc::new(RwLock::new(LinkState::Disconnected)),
        }
    }
}

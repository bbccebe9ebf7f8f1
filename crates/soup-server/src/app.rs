//! Application wiring: link manager, ingestion loop, and web server.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::ingest::run_ingest;
use soup_bus::EventBus;
use soup_link::LinkManager;
use soup_store::Store;
use soup_web::{run_server, AppState};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Depth of the raw-frame channel between the link and the ingestion
/// loop. Radio traffic is slow; this only buffers bursts after a
/// reconnect.
const FRAME_CHANNEL_CAPACITY: usize = 1024;

pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run until Ctrl-C or a fatal web-server error.
    pub async fn run(self) -> AppResult<()> {
        let store = Arc::new(Store::open(&self.config.persistence.data_dir)?);
        let bus = EventBus::new();

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let manager = LinkManager::new(self.config.kiss.link_config(), frame_tx);
        let link = manager.handle();
        let shutdown = manager.shutdown_token();

        let link_task = tokio::spawn(async move {
            manager.run().await;
        });

        let ingest_task = tokio::spawn(run_ingest(
            frame_rx,
            store.clone(),
            bus.clone(),
            self.config.publish_messages,
        ));

        let state = AppState::new(
            store,
            bus,
            link,
            self.config.mycall.clone(),
            self.config.digi_path.clone(),
            self.config.web.clone(),
        );
        let mut web_task = tokio::spawn(run_server(state, shutdown.clone()));

        let early_result = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                None
            }
            result = &mut web_task => Some(result),
        };

        shutdown.cancel();
        let _ = link_task.await;
        // The link manager dropped its frame sender; the ingestion loop
        // drains and exits on its own.
        let _ = ingest_task.await;

        let web_result = match early_result {
            Some(result) => result,
            None => web_task.await,
        };
        match web_result {
            Ok(Ok(())) => info!("Web server stopped"),
            Ok(Err(e)) => {
                error!(error = %e, "Web server failed");
                return Err(e.into());
            }
            Err(e) => {
                error!(error = %e, "Web server task panicked");
                return Err(std::io::Error::other(e).into());
            }
        }

        info!("Shutdown complete");
        Ok(())
    }
}

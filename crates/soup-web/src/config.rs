//! Web server configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Port to listen on.
    pub port: u16,
    /// Maximum concurrent live-stream connections.
    pub max_stream_connections: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 5032,
            max_stream_connections: 32,
        }
    }
}

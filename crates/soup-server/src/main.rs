//! APRS Soup server entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// APRS ingestion and fan-out server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SOUP_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    soup_telemetry::init_logging()?;

    info!("Starting APRS Soup server v{}", env!("CARGO_PKG_VERSION"));

    let config = soup_server::AppConfig::load(args.config)?;
    info!(
        mycall = %config.mycall,
        kiss_host = %config.kiss.host,
        kiss_port = config.kiss.port,
        web_port = config.web.port,
        "Configuration loaded"
    );

    soup_server::Application::new(config).run().await?;

    Ok(())
}

//! Prints every packet received by an attached Meshtastic radio as a JSON
//! line on stdout. Logs and diagnostics go to stderr.

use std::process::ExitCode;

use meshtastic_bridge::bridge::{self, StdoutSink};
use meshtastic_bridge::{MeshtasticConnector, SerialConfig};
use tracing_subscriber::EnvFilter;

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting up...");

    let connector = MeshtasticConnector::new(SerialConfig::default());
    let result = bridge::run(&connector, StdoutSink, shutdown_signal()).await;

    let (diagnostic, status) = bridge::outcome(&result);
    if let Some(message) = diagnostic {
        eprintln!("{message}");
    }
    ExitCode::from(status)
}

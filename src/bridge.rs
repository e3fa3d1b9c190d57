//! Packet-to-JSON bridge.
//!
//! Connects to the first discovered radio, writes one JSON line per received
//! packet, and runs until shutdown is requested or the radio goes away.

use std::future::Future;
use std::io::{self, Write};

use crate::error::{Error, Result};
use crate::transport::{Connector, Endpoint};
use crate::types::{Packet, PacketRecord};

/// Destination for output lines.
pub trait LineSink: Send + Sync + 'static {
    /// Writes one line and makes it visible to readers immediately.
    fn write_line(&self, line: &str) -> io::Result<()>;
}

/// Writes lines to standard output, flushing after each.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{line}")?;
        out.flush()
    }
}

/// Writes the output record for `packet` to `sink`.
pub fn emit<S: LineSink + ?Sized>(sink: &S, packet: &Packet) -> Result<()> {
    let line = PacketRecord::from(packet).to_json()?;
    sink.write_line(&line)?;
    Ok(())
}

/// Maps the bridge outcome to a console diagnostic and process exit status.
///
/// Shutdown on request prints nothing and exits with 0.
#[must_use]
pub fn outcome(result: &Result<()>) -> (Option<String>, u8) {
    match result {
        Ok(()) => (None, 0),
        Err(Error::NoDeviceFound) => (
            Some("No Meshtastic device found!".to_owned()),
            Error::NoDeviceFound.exit_status(),
        ),
        Err(e) => (Some(format!("Error occurred: {e}")), e.exit_status()),
    }
}

/// Runs the bridge until `shutdown` completes or the session ends.
///
/// Returns `Ok(())` on shutdown. Fails with [`Error::NoDeviceFound`] when no
/// endpoint is discovered, without attempting a connection.
pub async fn run<C, S, F>(connector: &C, sink: S, shutdown: F) -> Result<()>
where
    C: Connector + ?Sized,
    S: LineSink,
    F: Future<Output = ()>,
{
    let endpoints = connector.endpoints()?;
    let Some(endpoint) = endpoints.first().cloned() else {
        return Err(Error::NoDeviceFound);
    };

    let ports: Vec<String> = endpoints.iter().map(Endpoint::describe).collect();
    tracing::info!("Found ports: {:?}", ports);
    tracing::info!("Connecting to {}...", endpoint);

    let mut session = connector.open(endpoint).await?;
    session.on_receive(move |packet, _session| {
        if let Err(e) = emit(&sink, packet) {
            tracing::warn!("failed to write packet: {}", e);
        }
    });
    tracing::info!("Connected! Waiting for messages...");

    tokio::select! {
        () = shutdown => {
            tracing::info!("shutting down");
            session.finish().await;
            Ok(())
        }
        err = session.closed() => {
            session.finish().await;
            Err(err)
        }
    }
}

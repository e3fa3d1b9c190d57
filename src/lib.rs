//! # meshtastic-bridge
//!
//! Bridges packets received by a Meshtastic radio to newline-delimited JSON.
//!
//! The bridge finds the first attached radio, opens a session through the
//! `meshtastic` crate, and writes one flat JSON object per received packet to
//! stdout. Every record carries the same keys; missing values are `null`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use meshtastic_bridge::bridge::{self, StdoutSink};
//! use meshtastic_bridge::{MeshtasticConnector, SerialConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), meshtastic_bridge::Error> {
//!     let connector = MeshtasticConnector::new(SerialConfig::default());
//!     let shutdown = async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     };
//!     bridge::run(&connector, StdoutSink, shutdown).await
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`transport`] - Endpoints, serial discovery, the [`Connector`] trait
//! - [`radio`] - [`MeshtasticConnector`] and radio packet conversion
//! - [`session`] - Live [`Session`] owning the event registry
//! - [`event`] - Topic-based publish/subscribe
//! - [`types`] - Packets, output records, nodes
//! - [`bridge`] - The packet-to-JSON loop

pub mod bridge;
pub mod error;
pub mod event;
pub mod radio;
pub mod session;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use error::{Error, Result};
pub use event::{Event, EventDispatcher, Subscription, Topic};
pub use radio::{MeshtasticConnector, NodeTable};
pub use session::{Session, SessionHandle};
pub use transport::{Connector, Endpoint, SerialConfig, list_ports};
pub use types::{Decoded, Node, Packet, PacketRecord};

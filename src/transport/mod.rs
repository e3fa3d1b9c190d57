//! Transport layer for reaching a radio.
//!
//! A [`Connector`] discovers endpoints and opens sessions against them.
//! [`crate::radio::MeshtasticConnector`] is the serial implementation; tests
//! supply their own.

pub mod serial;

use std::fmt;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::session::Session;

/// USB identity of a serial endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbInfo {
    /// Vendor id.
    pub vid: u16,
    /// Product id.
    pub pid: u16,
    /// Product string reported by the device.
    pub product: Option<String>,
}

/// An addressable connection target, e.g. `/dev/ttyACM0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Device path.
    pub path: String,
    /// USB identity, if the port is a USB device.
    pub usb: Option<UsbInfo>,
}

impl Endpoint {
    /// Creates an endpoint for a bare device path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            usb: None,
        }
    }
}

impl Endpoint {
    /// Describes the endpoint for logs, e.g. `/dev/ttyACM0 (RAK4631, 239a:8029)`.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.usb {
            Some(UsbInfo {
                vid,
                pid,
                product: Some(product),
            }) => format!("{} ({product}, {vid:04x}:{pid:04x})", self.path),
            Some(UsbInfo { vid, pid, .. }) => format!("{} ({vid:04x}:{pid:04x})", self.path),
            None => self.path.clone(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Trait for radio connection providers.
pub trait Connector: Send + Sync {
    /// Lists reachable endpoints in a stable order. May be empty.
    fn endpoints(&self) -> Result<Vec<Endpoint>>;

    /// Opens a session against `endpoint`.
    fn open(&self, endpoint: Endpoint) -> BoxFuture<'_, Result<Session>>;
}

pub use serial::{SerialConfig, list_ports};

//! Serial port discovery and configuration.
//!
//! Radios show up as USB serial devices. Discovery prefers ports whose USB
//! vendor id belongs to a known radio chipset and skips debuggers and
//! other USB serial adapters that are never radios.

use tokio_serial::{SerialPortInfo, SerialPortType};

use crate::error::{Error, Result};
use crate::transport::{Endpoint, UsbInfo};

/// Default baud rate for Meshtastic devices.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default capacity of the session event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Vendor ids of known radio boards (Adafruit/RAK nRF52, Espressif).
pub const PREFERRED_VIDS: &[u16] = &[0x239a, 0x303a];

/// Vendor ids never used by radios (J-Link, STM, Nordic, Lakeview, Cypress).
pub const IGNORED_VIDS: &[u16] = &[0x1366, 0x0483, 0x1915, 0x0925, 0x04b4];

/// Configuration for serial sessions.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate.
    pub baud_rate: u32,
    /// DTR line state, left unchanged when `None`.
    pub dtr: Option<bool>,
    /// RTS line state, left unchanged when `None`.
    pub rts: Option<bool>,
    /// Capacity of the session event channel.
    pub event_capacity: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            dtr: None,
            rts: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SerialConfig {
    /// Creates a new serial configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Sets the DTR line state.
    #[must_use]
    pub const fn dtr(mut self, dtr: bool) -> Self {
        self.dtr = Some(dtr);
        self
    }

    /// Sets the RTS line state.
    #[must_use]
    pub const fn rts(mut self, rts: bool) -> Self {
        self.rts = Some(rts);
        self
    }

    /// Sets the event channel capacity.
    #[must_use]
    pub const fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

impl From<SerialPortInfo> for Endpoint {
    fn from(info: SerialPortInfo) -> Self {
        let usb = match info.port_type {
            SerialPortType::UsbPort(usb) => Some(UsbInfo {
                vid: usb.vid,
                pid: usb.pid,
                product: usb.product,
            }),
            _ => None,
        };
        Self {
            path: info.port_name,
            usb,
        }
    }
}

/// Narrows a port list down to likely radios, sorted by path.
///
/// Only USB ports are considered. If any port has a preferred vendor id,
/// only those are kept; otherwise every port without an ignored vendor id.
#[must_use]
pub fn likely_devices(ports: Vec<Endpoint>) -> Vec<Endpoint> {
    let usb: Vec<Endpoint> = ports.into_iter().filter(|p| p.usb.is_some()).collect();
    let vid_in = |port: &Endpoint, vids: &[u16]| port.usb.as_ref().is_some_and(|u| vids.contains(&u.vid));

    let mut selected: Vec<Endpoint> = if usb.iter().any(|p| vid_in(p, PREFERRED_VIDS)) {
        usb.into_iter()
            .filter(|p| vid_in(p, PREFERRED_VIDS))
            .collect()
    } else {
        usb.into_iter()
            .filter(|p| !vid_in(p, IGNORED_VIDS))
            .collect()
    };

    selected.sort_by(|a, b| a.path.cmp(&b.path));
    selected
}

/// Lists serial ports that are likely radios.
///
/// # Errors
///
/// Returns an error if the port list cannot be retrieved.
pub fn list_ports() -> Result<Vec<Endpoint>> {
    let ports = tokio_serial::available_ports().map_err(Error::Serial)?;
    tracing::debug!("{} serial ports present", ports.len());
    Ok(likely_devices(ports.into_iter().map(Endpoint::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usb(path: &str, vid: u16) -> Endpoint {
        Endpoint {
            path: path.into(),
            usb: Some(UsbInfo {
                vid,
                pid: 0x0001,
                product: None,
            }),
        }
    }

    fn paths(ports: &[Endpoint]) -> Vec<&str> {
        ports.iter().map(|p| p.path.as_str()).collect()
    }

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::new();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.dtr, None);
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn test_serial_config_builder() {
        let config = SerialConfig::new()
            .baud_rate(921_600)
            .rts(false)
            .event_capacity(16);
        assert_eq!(config.baud_rate, 921_600);
        assert_eq!(config.rts, Some(false));
        assert_eq!(config.event_capacity, 16);
    }

    #[test]
    fn test_preferred_vendor_wins() {
        let ports = vec![
            usb("/dev/ttyUSB0", 0x10c4),
            usb("/dev/ttyACM1", 0x303a),
            usb("/dev/ttyACM0", 0x239a),
        ];
        assert_eq!(
            paths(&likely_devices(ports)),
            ["/dev/ttyACM0", "/dev/ttyACM1"]
        );
    }

    #[test]
    fn test_ignored_vendors_dropped() {
        let ports = vec![
            usb("/dev/ttyUSB1", 0x1a86),
            usb("/dev/ttyACM0", 0x1366),
            usb("/dev/ttyUSB0", 0x10c4),
        ];
        assert_eq!(
            paths(&likely_devices(ports)),
            ["/dev/ttyUSB0", "/dev/ttyUSB1"]
        );
    }

    #[test]
    fn test_non_usb_ports_dropped() {
        let ports = vec![Endpoint::new("/dev/ttyS0"), Endpoint::new("/dev/ttyS1")];
        assert!(likely_devices(ports).is_empty());
    }

    #[test]
    #[ignore = "Requires /sys/class/tty - not available in sandboxed builds"]
    fn test_list_ports() {
        // Just verify it doesn't panic
        let _ = list_ports();
    }
}

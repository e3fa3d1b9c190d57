//! Error types for the bridge.

use thiserror::Error;

/// Exit status when no radio is found at startup.
pub const NO_DEVICE_STATUS: u8 = 1;

/// Exit status for any other fatal error.
pub const FAILURE_STATUS: u8 = 1;

/// The main error type for bridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No radio was found among the serial ports.
    #[error("no Meshtastic device found")]
    NoDeviceFound,

    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Session could not be established.
    #[error("connection error: {message}")]
    Connection { message: String },

    /// The radio stream ended.
    #[error("device disconnected")]
    Disconnected,

    /// Event channel closed.
    #[error("channel closed")]
    ChannelClosed,
}

impl Error {
    /// Creates a connection error from any displayable cause.
    pub fn connection(cause: impl std::fmt::Display) -> Self {
        Self::Connection {
            message: cause.to_string(),
        }
    }

    /// Returns the process exit status for this error.
    #[must_use]
    pub const fn exit_status(&self) -> u8 {
        if matches!(self, Self::NoDeviceFound) {
            NO_DEVICE_STATUS
        } else {
            FAILURE_STATUS
        }
    }
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the auto-swipe daemon.
//!
//! Gesture scheduling and synthesis never fail; these enums cover the IO
//! boundaries around them (config file, HID gadget device, control socket).
//! Only config and logging failures abort startup.

use thiserror::Error;

/// Errors related to the HID gadget transport.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open HID device '{path}': {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HID device is not connected")]
    NotConnected,

    #[error("Failed to write HID report: {0}")]
    WriteFailed(#[from] std::io::Error),
}

/// Errors related to IPC server operations.
#[derive(Error, Debug)]
pub enum IpcError {
    #[error("Failed to bind socket at '{path}': {source}")]
    SocketBindFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid command received: {0}")]
    InvalidCommand(String),

    #[error("Failed to serialize response: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors related to configuration management.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration lock poisoned")]
    LockPoisoned,

    #[error("Failed to write configuration: {0}")]
    WriteError(#[from] std::io::Error),
}

/// Top-level daemon errors.
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

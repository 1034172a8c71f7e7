//! # Error Types
//!
//! Custom error types for Field Telemetry using `thiserror`.

use thiserror::Error;

use crate::discovery::DeviceRole;

/// Main error type for Field Telemetry
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors (open, read, write)
    #[error("Serial error: {0}")]
    Serial(String),

    /// One or more device roles could not be bound to a serial port
    #[error("Device not found for role(s): {}", join_roles(.roles))]
    DeviceNotFound { roles: Vec<DeviceRole> },

    /// Durable sample store errors
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),
}

fn join_roles(roles: &[DeviceRole]) -> String {
    roles
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for Field Telemetry
pub type Result<T> = std::result::Result<T, TelemetryError>;

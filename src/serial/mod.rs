//! # Serial Communication Module
//!
//! Handles the serial devices on both ends of the radio link.
//!
//! This module handles:
//! - Opening USB serial devices with 8N1 settings
//! - Line framing with deadline-bounded reads (GPS sentences, modem output)
//! - A write-side trait so the transmitter can be tested without hardware

pub mod line_reader;
pub mod port_trait;

pub use line_reader::LineReader;
pub use port_trait::{SerialPortIO, TokioSerialPort};

use std::path::Path;

use crate::error::{Result, TelemetryError};
use tokio_serial::SerialPortBuilderExt;
use tracing::info;

/// Open a serial device for async I/O
///
/// # Arguments
///
/// * `path` - Device path (e.g., "/dev/ttyUSB0")
/// * `baud_rate` - Line speed in bits per second
///
/// # Returns
///
/// * `Result<SerialStream>` - Opened serial port
///
/// # Errors
///
/// Returns `TelemetryError::Serial` naming the path if the device cannot be
/// opened.
pub fn open_port(path: &Path, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    let device = path.display().to_string();
    let port = tokio_serial::new(device.as_str(), baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| TelemetryError::Serial(format!("Failed to open {}: {}", device, e)))?;

    info!("Opened serial device {} at {} baud", device, baud_rate);
    Ok(port)
}

//! # Telemetry Protocol Module
//!
//! Messages exchanged between field nodes and the base station.
//!
//! This module handles:
//! - Encoding outbound telemetry records (`seq,lat,lon,sender\r\n`)
//! - Parsing the receiving modem's diagnostic lines (RSSI + payload)
//! - Building the samples the base station persists

pub mod diagnostic;
pub mod record;
pub mod sample;

pub use diagnostic::{parse_line, ParseOutcome, ParsedFields};
pub use record::{is_valid_sender, TelemetryRecord, NO_FIX_SENTINEL};
pub use sample::ReceivedSample;

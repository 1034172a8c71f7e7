//! # GNSS Module
//!
//! Decoding of positioning-receiver output.
//!
//! This module handles:
//! - NMEA coordinate fields to signed decimal degrees
//! - `GGA` fix sentences with optional checksum validation

pub mod coordinate;
pub mod sentence;

pub use coordinate::{decode_coordinate, Hemisphere};
pub use sentence::parse_fix;

/// A decoded position report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    /// Latitude in decimal degrees (negative south)
    pub latitude: f64,
    /// Longitude in decimal degrees (negative west)
    pub longitude: f64,
}

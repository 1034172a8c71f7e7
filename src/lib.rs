//! # Field Telemetry Library
//!
//! GPS position telemetry from battery-powered field nodes to a LoRa base
//! station.
//!
//! A field node finds its GPS receiver and radio modem by persistent device
//! identifier, decodes NMEA fixes and transmits one record per cycle. The
//! base station parses the modem's diagnostic output and records every
//! received line, decodable or not, in SQLite and in a CSV log.

pub mod config;
pub mod discovery;
pub mod error;
pub mod gnss;
pub mod protocol;
pub mod receiver;
pub mod serial;
pub mod sink;
pub mod transmitter;

//! # Received Sample
//!
//! A base-station capture event. Decoded fields may all be `None`; the
//! timestamp and antenna label are always present.

use chrono::NaiveDateTime;

use super::diagnostic::ParseOutcome;

/// Timestamp text format shared by both sinks (second resolution)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One received line as persisted by the base station
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedSample {
    pub timestamp: NaiveDateTime,
    pub seq: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rssi: Option<f64>,
    pub antenna: String,
    pub sender: Option<String>,
}

impl ReceivedSample {
    /// Build a sample from a parse outcome
    ///
    /// An unparsed line still produces a sample: every decoded field is
    /// `None`, timestamp and antenna are kept.
    pub fn new(timestamp: NaiveDateTime, antenna: impl Into<String>, outcome: ParseOutcome) -> Self {
        let antenna = antenna.into();
        match outcome {
            ParseOutcome::Parsed(fields) => Self {
                timestamp,
                seq: Some(fields.seq),
                latitude: Some(fields.latitude),
                longitude: Some(fields.longitude),
                rssi: Some(fields.rssi),
                antenna,
                sender: Some(fields.sender),
            },
            ParseOutcome::Unparsed => Self {
                timestamp,
                seq: None,
                latitude: None,
                longitude: None,
                rssi: None,
                antenna,
                sender: None,
            },
        }
    }

    /// Capture time formatted for storage, e.g. `2025-07-14 09:30:05`
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Whether the decoded fields are present
    pub fn is_decoded(&self) -> bool {
        self.seq.is_some()
    }
}

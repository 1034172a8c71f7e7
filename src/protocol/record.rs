//! # Telemetry Record Encoding
//!
//! The transmitter's outbound wire message: `<seq>,<lat>,<lon>,<sender>\r\n`.

use std::fmt;

use crate::gnss::Fix;

/// Token written in place of each coordinate when no fix is available
pub const NO_FIX_SENTINEL: &str = "NOFIX";

/// Wire message terminator
pub const RECORD_TERMINATOR: &str = "\r\n";

/// Separates the record fields
pub const FIELD_SEPARATOR: char = ',';

/// Whether `label` can be carried as the sender field without changing the
/// record's field count or splitting the frame
pub fn is_valid_sender(label: &str) -> bool {
    !label.contains([FIELD_SEPARATOR, '\r', '\n'])
}

/// One outbound telemetry message
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    /// Transmit cycle number, starting at 0 for each process
    pub seq: i64,
    /// Position fix, if one was acquired this cycle
    pub fix: Option<Fix>,
    /// Free-text node label
    pub sender: String,
}

impl TelemetryRecord {
    pub fn new(seq: i64, fix: Option<Fix>, sender: impl Into<String>) -> Self {
        Self {
            seq,
            fix,
            sender: sender.into(),
        }
    }

    /// Encode the record as sent over the radio link, terminator included
    ///
    /// # Examples
    ///
    /// ```
    /// use field_telemetry::protocol::TelemetryRecord;
    ///
    /// let record = TelemetryRecord::new(3, None, "broad");
    /// assert_eq!(record.to_frame(), b"3,NOFIX,NOFIX,broad\r\n".to_vec());
    /// ```
    pub fn to_frame(&self) -> Vec<u8> {
        format!("{}{}", self, RECORD_TERMINATOR).into_bytes()
    }
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fix {
            Some(fix) => write!(
                f,
                "{},{:.6},{:.6},{}",
                self.seq, fix.latitude, fix.longitude, self.sender
            ),
            None => write!(
                f,
                "{},{},{},{}",
                self.seq, NO_FIX_SENTINEL, NO_FIX_SENTINEL, self.sender
            ),
        }
    }
}

//! # Diagnostic Line Parser
//!
//! The receiving radio modem reports each packet as a line of diagnostic text
//! with the signal strength in front of the payload:
//!
//! ```text
//! RSSI(-42dBm):Receive Data(7,35.681200,139.767100,node-A)
//! ```
//!
//! [`parse_line`] is total: any line yields either every field or none of
//! them.

/// Literal separating the signal-strength section from the payload section
pub const PAYLOAD_DELIMITER: &str = "):Receive Data(";

/// Marker preceding the signal-strength value
pub const RSSI_MARKER: &str = "RSSI(";

/// Unit suffix following the signal-strength value
pub const RSSI_UNIT: &str = "dBm";

/// Character closing the payload section
pub const PAYLOAD_CLOSE: char = ')';

/// Every field decoded from a well-formed diagnostic line
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFields {
    pub seq: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Received signal strength in dBm
    pub rssi: f64,
    pub sender: String,
}

/// Result of parsing one diagnostic line
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(ParsedFields),
    Unparsed,
}

impl ParseOutcome {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }
}

/// Parse one line of receiver diagnostic output
///
/// # Arguments
///
/// * `line` - One line from the receiving modem, without its terminator
///
/// # Returns
///
/// * `ParseOutcome::Parsed` - All five fields decoded
/// * `ParseOutcome::Unparsed` - Missing delimiter or wrapper, wrong field
///   count, or a field that does not convert
///
/// # Examples
///
/// ```
/// use field_telemetry::protocol::{parse_line, ParseOutcome};
///
/// match parse_line("RSSI(-42dBm):Receive Data(7,35.681200,139.767100,node-A)") {
///     ParseOutcome::Parsed(fields) => assert_eq!(fields.seq, 7),
///     ParseOutcome::Unparsed => unreachable!(),
/// }
/// assert_eq!(parse_line("garbage"), ParseOutcome::Unparsed);
/// ```
pub fn parse_line(line: &str) -> ParseOutcome {
    match parse_fields(line) {
        Some(fields) => ParseOutcome::Parsed(fields),
        None => ParseOutcome::Unparsed,
    }
}

fn parse_fields(line: &str) -> Option<ParsedFields> {
    let mut sections = line.split(PAYLOAD_DELIMITER);
    let (signal, payload) = match (sections.next(), sections.next(), sections.next()) {
        (Some(signal), Some(payload), None) => (signal, payload),
        _ => return None,
    };

    let rssi = parse_rssi(signal)?;

    let payload = payload.trim_end();
    if !payload.ends_with(PAYLOAD_CLOSE) {
        return None;
    }
    let payload = payload.trim_end_matches(PAYLOAD_CLOSE);

    let fields: Vec<&str> = payload.split(',').collect();
    let [seq, latitude, longitude, sender] = fields.as_slice() else {
        return None;
    };

    Some(ParsedFields {
        seq: seq.trim().parse().ok()?,
        latitude: parse_finite(latitude)?,
        longitude: parse_finite(longitude)?,
        rssi,
        sender: sender.trim().to_string(),
    })
}

/// Extract the dBm value between `RSSI(` and the end of the signal section
fn parse_rssi(signal: &str) -> Option<f64> {
    let (_, after_marker) = signal.split_once(RSSI_MARKER)?;
    let value = after_marker.split(RSSI_MARKER).next()?;
    parse_finite(&value.replace(RSSI_UNIT, ""))
}

/// Decimal value; `NaN` and infinities are rejected
fn parse_finite(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

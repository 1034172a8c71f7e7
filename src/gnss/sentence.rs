//! # Fix Sentence Parsing
//!
//! Extracts a position fix from `GGA` (fix data) sentences emitted by the
//! positioning receiver.

use super::coordinate::decode_coordinate;
use super::Fix;

/// Sentence identifiers that carry a position fix (GPS and multi-GNSS talkers)
pub const FIX_SENTENCE_IDS: &[&str] = &["GPGGA", "GNGGA"];

/// Parse a single NMEA line into a position fix
///
/// Returns `None` for any other sentence type, a failed checksum, empty
/// coordinate fields (receiver has no fix yet), or coordinates that do not
/// decode.
///
/// # Examples
///
/// ```
/// use field_telemetry::gnss::parse_fix;
///
/// let fix = parse_fix("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47").unwrap();
/// assert!((fix.latitude - 48.1173).abs() < 1e-4);
/// ```
pub fn parse_fix(line: &str) -> Option<Fix> {
    let line = line.trim();
    let body = line.strip_prefix('$')?;

    // Checksum is optional, but must match when present
    let body = match body.split_once('*') {
        Some((body, checksum)) => {
            if !checksum_matches(body, checksum) {
                return None;
            }
            body
        }
        None => body,
    };

    let fields: Vec<&str> = body.split(',').collect();
    if !FIX_SENTENCE_IDS.contains(&fields[0]) {
        return None;
    }
    if fields.len() <= 5 || fields[2].is_empty() || fields[4].is_empty() {
        return None;
    }

    let latitude = decode_coordinate(fields[2], fields[3])?;
    let longitude = decode_coordinate(fields[4], fields[5])?;
    Some(Fix { latitude, longitude })
}

/// XOR of every byte between `$` and `*`
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0u8, |acc, b| acc ^ b)
}

fn checksum_matches(body: &str, expected: &str) -> bool {
    match u8::from_str_radix(expected.trim(), 16) {
        Ok(expected) => checksum(body) == expected,
        Err(_) => false,
    }
}

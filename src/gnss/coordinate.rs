//! # NMEA Coordinate Decoding
//!
//! Converts `ddmm.mmmm` / `dddmm.mmmm` coordinate fields into signed decimal
//! degrees.

/// Hemisphere indicator of an NMEA coordinate field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    /// Parse a hemisphere letter (`N`, `S`, `E`, `W`)
    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter.trim() {
            "N" => Some(Self::North),
            "S" => Some(Self::South),
            "E" => Some(Self::East),
            "W" => Some(Self::West),
            _ => None,
        }
    }

    /// Number of leading digits that hold whole degrees
    fn degree_digits(self) -> usize {
        match self {
            Self::North | Self::South => 2,
            Self::East | Self::West => 3,
        }
    }

    fn max_degrees(self) -> f64 {
        match self {
            Self::North | Self::South => 90.0,
            Self::East | Self::West => 180.0,
        }
    }

    fn sign(self) -> f64 {
        match self {
            Self::South | Self::West => -1.0,
            Self::North | Self::East => 1.0,
        }
    }
}

/// Decode an NMEA coordinate field into signed decimal degrees
///
/// # Arguments
///
/// * `field` - Degrees immediately followed by minutes, e.g. `4807.038`
/// * `hemisphere` - One of `N`, `S`, `E`, `W`
///
/// # Returns
///
/// * `Option<f64>` - Decimal degrees (negative for `S`/`W`), or `None` when
///   the field cannot be decoded
///
/// # Examples
///
/// ```
/// use field_telemetry::gnss::decode_coordinate;
///
/// let lat = decode_coordinate("4807.038", "N").unwrap();
/// assert!((lat - 48.1173).abs() < 1e-4);
/// assert!(decode_coordinate("", "N").is_none());
/// ```
pub fn decode_coordinate(field: &str, hemisphere: &str) -> Option<f64> {
    let hemisphere = Hemisphere::from_letter(hemisphere)?;
    let field = field.trim();
    let width = hemisphere.degree_digits();

    // At least one minute digit must follow the degrees
    if field.len() <= width || !field.is_ascii() {
        return None;
    }

    let (degree_part, minute_part) = field.split_at(width);
    if !degree_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !minute_part.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        || minute_part.starts_with('.')
    {
        return None;
    }

    let degrees: f64 = degree_part.parse().ok()?;
    let minutes: f64 = minute_part.parse().ok()?;
    if minutes >= 60.0 {
        return None;
    }

    let value = degrees + minutes / 60.0;
    if value > hemisphere.max_degrees() {
        return None;
    }

    Some(hemisphere.sign() * value)
}

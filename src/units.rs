//! Physical quantities and the engineering-suffix parsing the SDS firmware
//! needs for its terse query replies.
//!
//! A reply such as `1.00GSa/s` or `200us` is split by a single pattern into
//! the longest leading float literal and a suffix. The suffix is then
//! scanned against a table of prefix letters in priority order; the first
//! letter found wins and otherwise the magnitude is taken in the base unit.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    // Exponent only counts when digits follow it
    static ref MAGNITUDE_RE: Regex =
        Regex::new(r"(?s)^([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)(.*)$")
            .expect("magnitude pattern is valid");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Volt,
    Second,
    Hertz,
    Samples,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Volt => "V",
            Unit::Second => "s",
            Unit::Hertz => "Hz",
            Unit::Samples => "pts",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalQuantity {
    pub magnitude: f64,
    pub unit: Unit,
}

impl PhysicalQuantity {
    pub fn new(magnitude: f64, unit: Unit) -> Self {
        Self { magnitude, unit }
    }

    pub fn volts(magnitude: f64) -> Self {
        Self::new(magnitude, Unit::Volt)
    }

    pub fn seconds(magnitude: f64) -> Self {
        Self::new(magnitude, Unit::Second)
    }

    pub fn hertz(magnitude: f64) -> Self {
        Self::new(magnitude, Unit::Hertz)
    }
}

impl fmt::Display for PhysicalQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.symbol())
    }
}

/// Ordered prefix letters and their multipliers. Earlier entries win.
pub struct SuffixTable(&'static [(char, f64)]);

impl SuffixTable {
    /// `SAMPLE_RATE?` replies, e.g. `500kSa/s`, `1.00GSa/s`.
    pub const SAMPLE_RATE: Self = Self(&[('G', 1e9), ('M', 1e6), ('K', 1e3), ('k', 1e3)]);

    /// Time replies (`TRIG_DELAY?`, `TIME_DIV?`), e.g. `-200us`.
    pub const TIME: Self = Self(&[('n', 1e-9), ('u', 1e-6), ('m', 1e-3)]);

    /// Voltage replies (`VOLT_DIV?`, `OFFSET?`), e.g. `500mV`.
    pub const VOLTAGE: Self = Self(&[
        ('n', 1e-9),
        ('u', 1e-6),
        ('m', 1e-3),
        ('k', 1e3),
        ('M', 1e6),
        ('G', 1e9),
    ]);

    /// `SAMPLE_NUM?` replies, e.g. `14Kpts`, `7.00E+05pts`.
    pub const SAMPLE_COUNT: Self = Self(&[('G', 1e9), ('M', 1e6), ('K', 1e3), ('k', 1e3)]);

    pub fn multiplier(&self, suffix: &str) -> f64 {
        self.0
            .iter()
            .find(|(letter, _)| suffix.contains(*letter))
            .map_or(1.0, |&(_, multiplier)| multiplier)
    }
}

/// Why a reply could not be turned into a number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitParseError {
    #[error("reply carries an echoed command header: '{0}'")]
    EchoedHeader(String),

    #[error("no numeric magnitude in '{0}'")]
    NoMagnitude(String),
}

/// Split `text` into its leading float literal and the remaining suffix.
pub fn split_magnitude(text: &str) -> Option<(f64, &str)> {
    let captures = MAGNITUDE_RE.captures(text)?;
    let magnitude = captures.get(1)?.as_str().parse::<f64>().ok()?;
    let suffix = captures.get(2).map_or("", |m| m.as_str());
    Some((magnitude, suffix))
}

/// Parse a terse reply into base units using `table` for the prefix scan.
pub fn parse_scaled(reply: &str, table: &SuffixTable) -> Result<f64, UnitParseError> {
    let trimmed = reply.trim();
    if trimmed.split_whitespace().count() > 1 {
        return Err(UnitParseError::EchoedHeader(trimmed.to_string()));
    }

    let (magnitude, suffix) =
        split_magnitude(trimmed).ok_or_else(|| UnitParseError::NoMagnitude(trimmed.to_string()))?;

    Ok(magnitude * table.multiplier(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= b.abs() * 1e-12
    }

    #[test]
    fn test_sample_rate_suffixes() {
        let table = SuffixTable::SAMPLE_RATE;
        assert!(close(parse_scaled("3.50G", &table).unwrap(), 3.5e9));
        assert!(close(parse_scaled("120M", &table).unwrap(), 1.2e8));
        assert!(close(parse_scaled("500K", &table).unwrap(), 5e5));
        assert!(close(parse_scaled("500kSa/s", &table).unwrap(), 5e5));
        assert!(close(parse_scaled("2.5Sa", &table).unwrap(), 2.5));
        assert!(close(parse_scaled("1.00GSa/s\n", &table).unwrap(), 1e9));
    }

    #[test]
    fn test_time_suffixes() {
        let table = SuffixTable::TIME;
        assert!(close(parse_scaled("10n", &table).unwrap(), 1e-8));
        assert!(close(parse_scaled("-200us", &table).unwrap(), -2e-4));
        assert!(close(parse_scaled("2.5ms", &table).unwrap(), 2.5e-3));
        assert!(close(parse_scaled("1.5s", &table).unwrap(), 1.5));
        assert!(close(parse_scaled("5.00E-04S", &table).unwrap(), 5e-4));
    }

    #[test]
    fn test_voltage_suffixes() {
        let table = SuffixTable::VOLTAGE;
        assert!(close(parse_scaled("500mV", &table).unwrap(), 0.5));
        assert!(close(parse_scaled("5.00E-01V", &table).unwrap(), 0.5));
        assert!(close(parse_scaled("2uV", &table).unwrap(), 2e-6));
        assert!(close(parse_scaled("1kV", &table).unwrap(), 1e3));
        assert_eq!(parse_scaled("0.00E+00V", &table).unwrap(), 0.0);
    }

    #[test]
    fn test_first_prefix_in_priority_order_wins() {
        // 'G' outranks 'M' even when both letters are present
        assert!(close(SuffixTable::SAMPLE_RATE.multiplier("GMSa"), 1e9));
        // 'm' in "ms" is milli; the trailing 's' is just the base unit
        assert!(close(SuffixTable::TIME.multiplier("ms"), 1e-3));
        assert_eq!(SuffixTable::TIME.multiplier("s"), 1.0);
    }

    #[test]
    fn test_exponent_requires_digits() {
        assert_eq!(split_magnitude("1.5e"), Some((1.5, "e")));
        assert_eq!(split_magnitude("2E+3V"), Some((2000.0, "V")));
        assert_eq!(split_magnitude("-.5mV"), Some((-0.5, "mV")));
        assert_eq!(split_magnitude("+3.kV"), Some((3.0, "kV")));
        assert_eq!(split_magnitude(".e3"), None);
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        assert!(matches!(
            parse_scaled("Sa/s", &SuffixTable::SAMPLE_RATE),
            Err(UnitParseError::NoMagnitude(_))
        ));
        assert!(matches!(
            parse_scaled("", &SuffixTable::VOLTAGE),
            Err(UnitParseError::NoMagnitude(_))
        ));
        assert!(matches!(
            parse_scaled("..V", &SuffixTable::VOLTAGE),
            Err(UnitParseError::NoMagnitude(_))
        ));
    }

    #[test]
    fn test_echoed_header_is_detected() {
        assert!(matches!(
            parse_scaled("C1:VDIV 5.00E-01V", &SuffixTable::VOLTAGE),
            Err(UnitParseError::EchoedHeader(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(PhysicalQuantity::volts(0.5).to_string(), "0.5V");
        assert_eq!(PhysicalQuantity::hertz(1e6).to_string(), "1000000Hz");
    }
}

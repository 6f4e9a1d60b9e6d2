//! Value conversion helpers for status fields.
//!
//! Status lines carry every value as text. These helpers turn the common
//! encodings into typed values so per-object token tables stay one line
//! per field. They are deliberately strict: anything that does not parse
//! becomes an [`Error::Protocol`] which the caller logs and skips.

use crate::error::{Error, Result};

/// Parse a signed decimal integer.
pub fn parse_i32(value: &str) -> Result<i32> {
    value
        .parse::<i32>()
        .map_err(|_| Error::Protocol(format!("invalid integer: {value}")))
}

/// Parse an unsigned decimal integer.
pub fn parse_u32(value: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .map_err(|_| Error::Protocol(format!("invalid unsigned integer: {value}")))
}

/// Parse a floating point number.
pub fn parse_f64(value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| Error::Protocol(format!("invalid number: {value}")))
}

/// Parse a `1`/`0` flag. `true`/`false` are accepted as well since a few
/// firmware versions spell some flags out.
pub fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "1" | "true" | "True" => Ok(true),
        "0" | "false" | "False" => Ok(false),
        _ => Err(Error::Protocol(format!("invalid flag: {value}"))),
    }
}

/// Parse a 32-bit hex value with or without a `0x` prefix.
pub fn parse_hex_u32(value: &str) -> Option<u32> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    if digits.is_empty() {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Parse a hex handle field, reporting a protocol error on failure.
pub fn parse_handle(value: &str) -> Result<u32> {
    parse_hex_u32(value).ok_or_else(|| Error::Protocol(format!("invalid hex handle: {value}")))
}

/// Parse a MHz field into hertz.
pub fn parse_mhz_as_hz(value: &str) -> Result<u64> {
    let mhz = parse_f64(value)?;
    if mhz < 0.0 {
        return Err(Error::Protocol(format!("negative frequency: {value}")));
    }
    Ok(mhz_to_hz(mhz))
}

/// Convert frequency in MHz (`f64`) to Hz (`u64`).
pub fn mhz_to_hz(mhz: f64) -> u64 {
    (mhz * 1_000_000.0).round() as u64
}

/// Convert frequency in Hz (`u64`) to MHz (`f64`).
pub fn hz_to_mhz(hz: u64) -> f64 {
    hz as f64 / 1_000_000.0
}

/// Format a frequency in hertz the way the radio expects it in commands:
/// MHz with six decimal places.
pub fn format_mhz(hz: u64) -> String {
    format!("{:.6}", hz_to_mhz(hz))
}

/// Format a handle the way the radio writes it: `0x` plus eight uppercase
/// hex digits.
pub fn format_handle(handle: u32) -> String {
    format!("0x{handle:08X}")
}

/// Status values use `\u{7f}` in place of spaces inside a single token.
pub fn unescape_spaces(value: &str) -> String {
    value.replace('\u{7f}', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers() {
        assert_eq!(parse_i32("-150").unwrap(), -150);
        assert_eq!(parse_u32("2900").unwrap(), 2900);
        assert!(parse_u32("-1").is_err());
        assert!(parse_i32("abc").is_err());
    }

    #[test]
    fn flags() {
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool("yes").is_err());
    }

    #[test]
    fn hex_handles() {
        assert_eq!(parse_hex_u32("0x40000000"), Some(0x4000_0000));
        assert_eq!(parse_hex_u32("0X2A"), Some(0x2A));
        assert_eq!(parse_hex_u32("12345678"), Some(0x1234_5678));
        assert_eq!(parse_hex_u32("0x"), None);
        assert_eq!(parse_hex_u32("zz"), None);
        assert!(parse_handle("nothex").is_err());
    }

    #[test]
    fn mhz_round_trip() {
        for &hz in &[500_000u64, 1_850_001, 7_074_000, 14_250_000, 54_000_000] {
            assert_eq!(mhz_to_hz(hz_to_mhz(hz)), hz, "round trip for {hz}");
        }
        assert_eq!(parse_mhz_as_hz("14.250000").unwrap(), 14_250_000);
        assert!(parse_mhz_as_hz("-1.0").is_err());
    }

    #[test]
    fn formatting() {
        assert_eq!(format_mhz(14_250_000), "14.250000");
        assert_eq!(format_mhz(500_000), "0.500000");
        assert_eq!(format_handle(0x42), "0x00000042");
    }

    #[test]
    fn escaped_spaces() {
        assert_eq!(unescape_spaces("Signal\u{7f}strength"), "Signal strength");
    }
}

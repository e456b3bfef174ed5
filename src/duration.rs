//! TTL parsing.
//!
//! A TTL is a sequence of `<number><unit>` terms, e.g. `"10m"`, `"2h30m"`,
//! `"1.5h"` or `"500ms"`. Numbers may carry a fractional part.
//!
//! Supported units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`, `d`.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when parsing a TTL.
#[derive(Debug, Error, PartialEq)]
pub enum DurationParseError {
    #[error("empty duration string")]
    Empty,

    #[error("invalid duration format: {0}")]
    InvalidFormat(String),

    #[error("invalid numeric value: {0}")]
    InvalidNumber(String),

    #[error("unknown time unit: {0}")]
    UnknownUnit(String),

    #[error("duration must be positive: {0}")]
    NotPositive(String),
}

const NANOS_PER_UNIT: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("us", 1e3),
    ("µs", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 60.0 * 1e9),
    ("h", 3600.0 * 1e9),
    ("d", 86400.0 * 1e9),
];

/// Parse a TTL string into a strictly positive `Duration`.
///
/// ```
/// use kasher::duration::parse_ttl;
/// use std::time::Duration;
///
/// assert_eq!(parse_ttl("1h30m").unwrap(), Duration::from_secs(5400));
/// assert_eq!(parse_ttl("500ms").unwrap(), Duration::from_millis(500));
/// ```
pub fn parse_ttl(s: &str) -> Result<Duration, DurationParseError> {
    let input = s.trim();
    if input.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let body = match input.as_bytes()[0] {
        b'-' => return Err(DurationParseError::NotPositive(input.to_string())),
        b'+' => &input[1..],
        _ => input,
    };
    if body.is_empty() {
        return Err(DurationParseError::InvalidFormat(input.to_string()));
    }

    let mut total_nanos = 0f64;
    let mut rest = body;

    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(DurationParseError::InvalidFormat(
                "unit without preceding number".into(),
            ));
        }
        let (num_str, after_num) = rest.split_at(num_len);
        let num: f64 = num_str
            .parse()
            .map_err(|_| DurationParseError::InvalidNumber(num_str.to_string()))?;

        let unit_len = after_num
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_num.len());
        if unit_len == 0 {
            return Err(DurationParseError::InvalidFormat(
                "number without unit".into(),
            ));
        }
        let (unit, after_unit) = after_num.split_at(unit_len);
        let multiplier = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, nanos)| *nanos)
            .ok_or_else(|| DurationParseError::UnknownUnit(unit.to_string()))?;

        total_nanos += num * multiplier;
        rest = after_unit;
    }

    if !total_nanos.is_finite() || total_nanos >= u64::MAX as f64 {
        return Err(DurationParseError::InvalidNumber(input.to_string()));
    }

    let nanos = total_nanos as u64;
    if nanos == 0 {
        return Err(DurationParseError::NotPositive(input.to_string()));
    }

    Ok(Duration::from_nanos(nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_units() {
        assert_eq!(parse_ttl("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_ttl("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_ttl("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_ttl("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_ttl("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_ttl("250us").unwrap(), Duration::from_micros(250));
        assert_eq!(parse_ttl("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn test_combined_and_fractional() {
        assert_eq!(parse_ttl("2h30m").unwrap(), Duration::from_secs(9000));
        assert_eq!(parse_ttl("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_ttl("1m30.5s").unwrap(), Duration::from_millis(90_500));
        assert_eq!(parse_ttl(" 24h ").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_ttl("+5s").unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(parse_ttl(""), Err(DurationParseError::Empty));
        assert_eq!(parse_ttl("   "), Err(DurationParseError::Empty));
        assert!(matches!(
            parse_ttl("not-a-duration"),
            Err(DurationParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_ttl("10"),
            Err(DurationParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_ttl("3w"),
            Err(DurationParseError::UnknownUnit(_))
        ));
        assert!(matches!(
            parse_ttl("1..5h"),
            Err(DurationParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(matches!(
            parse_ttl("0s"),
            Err(DurationParseError::NotPositive(_))
        ));
        assert!(matches!(
            parse_ttl("-1h"),
            Err(DurationParseError::NotPositive(_))
        ));
    }
}

//! Duration parsing utilities.

use std::time::Duration;
use crate::constants::time;

/// Parses a duration string like "30s", "5m", "1h" into a Duration.
///
/// # Arguments
/// * `s` - Duration string (e.g., "30s", "5m", "1h")
///
/// # Returns
/// * `Ok(Duration)` on success
/// * `Err(&str)` with error message on failure
pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
    let s = s.trim();
    let unit = s.chars().last().ok_or("Empty duration")?;
    let value: u64 = s[..s.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| "Invalid number in duration")?;

    let scale = match unit {
        's' => 1,
        'm' => time::SECONDS_PER_MINUTE,
        'h' => time::SECONDS_PER_HOUR,
        _ => return Err("Invalid duration unit"),
    };

    value
        .checked_mul(scale)
        .map(Duration::from_secs)
        .ok_or("Duration too large")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_units() {
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration(" 2m "), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("abcs").is_err());
        assert!(parse_duration("5é").is_err());
    }

    #[test]
    fn rejects_overflowing_values() {
        assert_eq!(parse_duration("18446744073709551615h"), Err("Duration too large"));
        assert_eq!(parse_duration("18446744073709551615m"), Err("Duration too large"));
        assert_eq!(
            parse_duration("18446744073709551615s"),
            Ok(Duration::from_secs(u64::MAX))
        );
    }
}

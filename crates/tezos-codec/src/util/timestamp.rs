//! RFC 3339 formatting and parsing for block timestamps.
//!
//! Block headers carry seconds since the Unix epoch as a big-endian int64.
//! The node renders them as `YYYY-MM-DDTHH:MM:SSZ`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

fn invalid(s: &str) -> ParseError {
    ParseError::InvalidTimestamp(s.to_string())
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since 1970-01-01 for a civil date (Howard Hinnant's algorithm).
fn date_to_days(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let m = if month <= 2 { month + 9 } else { month - 3 } as i64;
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let doy = (153 * m + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

/// Civil date for a day count since 1970-01-01.
fn days_to_date(days: i64) -> (i64, u32, u32) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

/// Formats seconds since the epoch as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_rfc3339(epoch_seconds: i64) -> String {
    let days = epoch_seconds.div_euclid(SECONDS_PER_DAY);
    let secs = epoch_seconds.rem_euclid(SECONDS_PER_DAY);
    let (year, month, day) = days_to_date(days);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        secs / SECONDS_PER_HOUR,
        (secs % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE,
        secs % SECONDS_PER_MINUTE
    )
}

fn parse_offset_seconds(s: &str, offset: &str) -> Result<i64, ParseError> {
    if offset == "Z" || offset == "z" {
        return Ok(0);
    }
    let bytes = offset.as_bytes();
    if bytes.len() != 6 || bytes[3] != b':' {
        return Err(invalid(s));
    }
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return Err(invalid(s)),
    };
    let hours: i64 = offset[1..3].parse().map_err(|_| invalid(s))?;
    let minutes: i64 = offset[4..6].parse().map_err(|_| invalid(s))?;
    if hours > 23 || minutes > 59 {
        return Err(invalid(s));
    }
    Ok(sign * (hours * SECONDS_PER_HOUR + minutes * SECONDS_PER_MINUTE))
}

/// Parses an RFC 3339 date-time into seconds since the epoch.
///
/// Fractional seconds are accepted and truncated.
pub fn parse_rfc3339(s: &str) -> Result<i64, ParseError> {
    if s.len() < 20 || !s.is_ascii() {
        return Err(invalid(s));
    }
    let b = s.as_bytes();
    if b[4] != b'-' || b[7] != b'-' || !matches!(b[10], b'T' | b't' | b' ') || b[13] != b':' || b[16] != b':'
    {
        return Err(invalid(s));
    }
    let year: i64 = s[..4].parse().map_err(|_| invalid(s))?;
    let month: u32 = s[5..7].parse().map_err(|_| invalid(s))?;
    let day: u32 = s[8..10].parse().map_err(|_| invalid(s))?;
    let hours: i64 = s[11..13].parse().map_err(|_| invalid(s))?;
    let minutes: i64 = s[14..16].parse().map_err(|_| invalid(s))?;
    let seconds: i64 = s[17..19].parse().map_err(|_| invalid(s))?;

    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
        return Err(invalid(s));
    }
    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err(invalid(s));
    }

    let mut rest = &s[19..];
    if let Some(frac) = rest.strip_prefix('.') {
        let digits = frac.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(invalid(s));
        }
        rest = &frac[digits..];
    }
    let offset = parse_offset_seconds(s, rest)?;

    let local = date_to_days(year, month, day) * SECONDS_PER_DAY
        + hours * SECONDS_PER_HOUR
        + minutes * SECONDS_PER_MINUTE
        + seconds;
    Ok(local - offset)
}

/// Seconds since the Unix epoch, rendered as RFC 3339 in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn seconds(self) -> i64 {
        self.0
    }
}

impl From<i64> for Timestamp {
    fn from(seconds: i64) -> Self {
        Self(seconds)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_rfc3339(self.0))
    }
}

impl FromStr for Timestamp {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_rfc3339(s).map(Self)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_known_values() {
        assert_eq!(format_rfc3339(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_rfc3339(1_530_057_600), "2018-06-27T00:00:00Z");
        assert_eq!(format_rfc3339(951_782_400), "2000-02-29T00:00:00Z");
        assert_eq!(format_rfc3339(-1), "1969-12-31T23:59:59Z");
    }

    #[test]
    fn test_parse_known_values() {
        assert_eq!(parse_rfc3339("1970-01-01T00:00:00Z").unwrap(), 0);
        assert_eq!(parse_rfc3339("2018-06-30T16:07:32Z").unwrap(), 1_530_374_852);
        assert_eq!(parse_rfc3339("2018-06-30T18:07:32+02:00").unwrap(), 1_530_374_852);
        assert_eq!(parse_rfc3339("2018-06-30T16:07:32.750Z").unwrap(), 1_530_374_852);
    }

    #[test]
    fn test_roundtrip() {
        for secs in [0i64, 1, 86_399, 86_400, 1_700_000_000, -86_401, 4_102_444_800] {
            assert_eq!(parse_rfc3339(&format_rfc3339(secs)).unwrap(), secs, "{secs}");
        }
    }

    #[test]
    fn test_invalid_inputs() {
        for s in [
            "",
            "2018-13-01T00:00:00Z",
            "2019-02-29T00:00:00Z",
            "2018-06-30T24:00:00Z",
            "2018-06-30T16:07:32",
            "2018-06-30T16:07:32+2:00",
            "2018-06-30T16:07:32.Z",
        ] {
            assert!(parse_rfc3339(s).is_err(), "{s}");
        }
    }

    #[test]
    fn test_json() {
        let ts = Timestamp(1_530_374_852);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"2018-06-30T16:07:32Z\"");
    }
}

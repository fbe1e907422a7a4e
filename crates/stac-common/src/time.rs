//! Time handling for observation timestamps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Naive layouts accepted after RFC 3339, all interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp as written in observation records.
///
/// Accepts RFC 3339 (any offset, converted to UTC), naive date-times with
/// optional fractional seconds and either `T` or a space as separator, and
/// bare dates (midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// A closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Smallest range covering both inputs.
    pub fn union(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    /// Check if `other` lies entirely inside this range.
    pub fn covers(&self, other: &TimeRange) -> bool {
        self.contains(&other.start) && self.contains(&other.end)
    }

    /// Whether start precedes or equals end.
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_timestamp("2018-04-21T12:30:00Z").unwrap();
        assert_eq!(dt.year(), 2018);
        assert_eq!(dt.month(), 4);
        assert_eq!(dt.day(), 21);
        assert_eq!(dt.hour(), 12);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn test_parse_offset_converted_to_utc() {
        let dt = parse_timestamp("2018-04-21T14:30:00+02:00").unwrap();
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_parse_naive_with_fraction() {
        let dt = parse_timestamp("2018-04-21 23:59:58.250").unwrap();
        assert_eq!(dt.second(), 58);
        assert_eq!(dt.nanosecond(), 250_000_000);

        let dt = parse_timestamp("2018-04-21T23:59:58").unwrap();
        assert_eq!(dt.minute(), 59);
    }

    #[test]
    fn test_parse_date_only() {
        let dt = parse_timestamp("2018-05-01").unwrap();
        assert_eq!(dt.hour(), 0);
        assert_eq!(dt.day(), 1);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            parse_timestamp("not a date"),
            Err(TimeParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_range_union() {
        let a = TimeRange::new(
            Utc.with_ymd_and_hms(2018, 4, 21, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2018, 4, 22, 0, 0, 0).unwrap(),
        );
        let b = TimeRange::new(
            Utc.with_ymd_and_hms(2018, 4, 20, 6, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2018, 4, 21, 12, 0, 0).unwrap(),
        );

        let u = a.union(&b);
        assert_eq!(u.start, b.start);
        assert_eq!(u.end, a.end);
        assert!(u.covers(&a));
        assert!(u.covers(&b));
    }
}

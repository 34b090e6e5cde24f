//! Timestamp parsing for raw source files.
//!
//! Grid-operator files carry RFC 3339 instants; weather normals carry a
//! year-independent `MM-DDTHH:MM:SS` stamp that is expanded once per year.

use crate::table::{utc, Timestamp};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// How a source encodes its timestamp column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimestampFormat {
    /// `2022-08-07T07:00:00-00:00`
    #[default]
    Rfc3339,

    /// A chrono pattern without offset; values are taken as UTC.
    NaiveUtc { pattern: String },

    /// A chrono pattern without a year (e.g. `%m-%dT%H:%M:%S`). Every value is
    /// stamped once per listed year, in UTC.
    YearlessUtc { pattern: String, years: Vec<i32> },
}

impl TimestampFormat {
    /// Parse one raw value into zero or more timestamps.
    ///
    /// Yearless values yield one timestamp per year; a date that does not
    /// exist in some year (Feb 29) is skipped for that year. The other formats
    /// always yield exactly one timestamp.
    pub fn parse(&self, raw: &str) -> Result<Vec<Timestamp>, String> {
        let raw = raw.trim();
        match self {
            TimestampFormat::Rfc3339 => DateTime::parse_from_rfc3339(raw)
                .map(|ts| vec![ts])
                .map_err(|e| e.to_string()),
            TimestampFormat::NaiveUtc { pattern } => NaiveDateTime::parse_from_str(raw, pattern)
                .map(|naive| vec![utc(naive.and_utc())])
                .map_err(|e| e.to_string()),
            TimestampFormat::YearlessUtc { pattern, years } => {
                let stamped_pattern = format!("%Y-{pattern}");
                let mut out = Vec::with_capacity(years.len());
                let mut last_err = None;
                for year in years {
                    match NaiveDateTime::parse_from_str(&format!("{year}-{raw}"), &stamped_pattern)
                    {
                        Ok(naive) => out.push(utc(naive.and_utc())),
                        Err(e) => last_err = Some(e.to_string()),
                    }
                }
                // A stamp valid in no year at all is malformed, not a leap-day gap.
                match (out.is_empty(), last_err) {
                    (true, Some(e)) => Err(e),
                    _ => Ok(out),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn rfc3339_with_negative_zero_offset() {
        let ts = TimestampFormat::Rfc3339
            .parse("2022-08-07T07:00:00-00:00")
            .unwrap();
        assert_eq!(ts.len(), 1);
        assert_eq!(ts[0], Utc.with_ymd_and_hms(2022, 8, 7, 7, 0, 0).unwrap());
    }

    #[test]
    fn naive_pattern_is_utc() {
        let fmt = TimestampFormat::NaiveUtc {
            pattern: "%Y-%m-%d %H:%M".into(),
        };
        let ts = fmt.parse("2023-01-02 13:05").unwrap();
        assert_eq!(ts[0], Utc.with_ymd_and_hms(2023, 1, 2, 13, 5, 0).unwrap());
        assert_eq!(ts[0].offset().local_minus_utc(), 0);
    }

    #[test]
    fn yearless_expands_per_year() {
        let fmt = TimestampFormat::YearlessUtc {
            pattern: "%m-%dT%H:%M:%S".into(),
            years: vec![2021, 2022],
        };
        let ts = fmt.parse("08-01T05:00:00").unwrap();
        assert_eq!(
            ts,
            vec![
                Utc.with_ymd_and_hms(2021, 8, 1, 5, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2022, 8, 1, 5, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn yearless_skips_leap_day_in_common_years() {
        let fmt = TimestampFormat::YearlessUtc {
            pattern: "%m-%dT%H:%M:%S".into(),
            years: vec![2020, 2021],
        };
        let ts = fmt.parse("02-29T00:00:00").unwrap();
        assert_eq!(ts.len(), 1);
        assert_eq!(ts[0], Utc.with_ymd_and_hms(2020, 2, 29, 0, 0, 0).unwrap());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(TimestampFormat::Rfc3339.parse("yesterday").is_err());
        let fmt = TimestampFormat::YearlessUtc {
            pattern: "%m-%dT%H:%M:%S".into(),
            years: vec![2022],
        };
        assert!(fmt.parse("13-45T99:00:00").is_err());
    }
}

//! Hourly resampling of sub-hourly series.

use crate::error::{FeatureError, Result};
use crate::table::{utc, Column, TimeIndex, TimeSeriesTable, Timestamp};
use chrono::DateTime;

const SECONDS_PER_HOUR: i64 = 3600;

/// Floor a timestamp to the start of its UTC hour.
pub fn floor_hour(ts: &Timestamp) -> Option<Timestamp> {
    let secs = ts.timestamp().div_euclid(SECONDS_PER_HOUR) * SECONDS_PER_HOUR;
    DateTime::from_timestamp(secs, 0).map(utc)
}

/// Average every column over the rows that share a floored hour.
///
/// `NaN` cells are skipped; a bucket with no finite value stays `NaN`. Hours
/// with no source rows are not synthesized. Resampling an hourly table returns
/// an equal table.
pub fn resample_hourly(table: &TimeSeriesTable) -> Result<TimeSeriesTable> {
    // Rows are ascending, so each hour is one contiguous run of rows.
    let mut buckets: Vec<(Timestamp, std::ops::Range<usize>)> = Vec::new();
    for (row, ts) in table.index().iter().enumerate() {
        let hour = floor_hour(ts).ok_or_else(|| FeatureError::TimestampParse {
            column: "index".into(),
            value: ts.to_rfc3339(),
            reason: "out of range when flooring to the hour".into(),
        })?;
        match buckets.last_mut() {
            Some((last, range)) if *last == hour => range.end = row + 1,
            _ => buckets.push((hour, row..row + 1)),
        }
    }

    let index = TimeIndex::new(buckets.iter().map(|(ts, _)| *ts).collect())?;
    let columns = table
        .columns()
        .iter()
        .map(|col| {
            let values = buckets
                .iter()
                .map(|(_, range)| nan_mean(&col.values[range.clone()]))
                .collect();
            Column::new(col.name.clone(), values)
        })
        .collect();

    TimeSeriesTable::from_columns(index, columns)
}

fn nan_mean(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

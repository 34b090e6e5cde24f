//! Per-row derived features: threshold indicators, calendar flags, cyclical
//! encodings and arithmetic aggregates.
//!
//! None of these look at other rows. Calendar features read the timestamp's
//! own offset, so the table should be localized before they are computed.

use crate::error::{FeatureError, Result};
use crate::table::{TimeIndex, TimeSeriesTable};
use chrono::{Datelike, Timelike, Weekday};
use std::f64::consts::PI;

// ── Threshold indicators ────────────────────────────────────────────

/// `1.0` where `v >= threshold`, `0.0` below, `NaN` where `v` is missing.
pub fn threshold_indicator(values: &[f64], threshold: f64) -> Vec<f64> {
    values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                f64::NAN
            } else if v >= threshold {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

pub fn attach_threshold(
    table: TimeSeriesTable,
    source: &str,
    threshold: f64,
    name: &str,
) -> Result<TimeSeriesTable> {
    let values = threshold_indicator(table.require(source, name)?, threshold);
    table.with_column(name, values)
}

// ── Calendar features ───────────────────────────────────────────────

/// Calendar columns derived from an index.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarColumns {
    pub friday: Vec<f64>,
    pub weekend: Vec<f64>,
    pub hour: Vec<f64>,
    pub month: Vec<f64>,
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

pub fn calendar_columns(index: &TimeIndex) -> CalendarColumns {
    let n = index.len();
    let mut cols = CalendarColumns {
        friday: Vec::with_capacity(n),
        weekend: Vec::with_capacity(n),
        hour: Vec::with_capacity(n),
        month: Vec::with_capacity(n),
    };
    for ts in index.iter() {
        let weekday = ts.weekday();
        cols.friday.push(flag(weekday == Weekday::Fri));
        cols.weekend.push(flag(matches!(weekday, Weekday::Sat | Weekday::Sun)));
        cols.hour.push(f64::from(ts.hour()));
        cols.month.push(f64::from(ts.month()));
    }
    cols
}

/// `1.0` for hours in `start..=end`, else `0.0`.
pub fn on_peak_indicator(hours: &[f64], start: u32, end: u32) -> Vec<f64> {
    let (start, end) = (f64::from(start), f64::from(end));
    hours
        .iter()
        .map(|&h| {
            if h.is_nan() {
                f64::NAN
            } else {
                flag(h >= start && h <= end)
            }
        })
        .collect()
}

/// Names of the calendar columns to attach.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarNames {
    pub friday: String,
    pub weekend: String,
    pub hour: String,
    pub month: String,
    /// On-peak flag name and inclusive hour window, if wanted.
    pub on_peak: Option<(String, u32, u32)>,
}

impl Default for CalendarNames {
    fn default() -> Self {
        Self {
            friday: "friday".into(),
            weekend: "weekend".into(),
            hour: "hour".into(),
            month: "month".into(),
            on_peak: Some(("on_peak_hour".into(), 16, 21)),
        }
    }
}

pub fn attach_calendar(table: TimeSeriesTable, names: &CalendarNames) -> Result<TimeSeriesTable> {
    let cols = calendar_columns(table.index());
    let on_peak = names
        .on_peak
        .as_ref()
        .map(|(name, start, end)| (name.clone(), on_peak_indicator(&cols.hour, *start, *end)));

    let mut table = table
        .with_column(names.friday.as_str(), cols.friday)?
        .with_column(names.weekend.as_str(), cols.weekend)?
        .with_column(names.hour.as_str(), cols.hour)?;
    if let Some((name, values)) = on_peak {
        table = table.with_column(name, values)?;
    }
    table.with_column(names.month.as_str(), cols.month)
}

// ── Cyclical encoding ───────────────────────────────────────────────

/// `(sin(2πv/period), cos(2πv/period))` for every value.
pub fn cyclical(values: &[f64], period: f64) -> (Vec<f64>, Vec<f64>) {
    values
        .iter()
        .map(|&v| {
            let angle = 2.0 * PI * v / period;
            (angle.sin(), angle.cos())
        })
        .unzip()
}

/// Attach `sin_{column}` and `cos_{column}`.
pub fn attach_cyclical(
    table: TimeSeriesTable,
    column: &str,
    period: f64,
) -> Result<TimeSeriesTable> {
    let sin_name = format!("sin_{column}");
    let (sin, cos) = cyclical(table.require(column, &sin_name)?, period);
    table
        .with_column(sin_name, sin)?
        .with_column(format!("cos_{column}"), cos)
}

// ── Arithmetic aggregates ───────────────────────────────────────────

/// `Σ add − Σ subtract`, cell by cell.
///
/// A referenced column that does not exist is an error, never a column of
/// `NaN`. A missing cell in any operand makes that row's result `NaN`.
pub fn combine(
    table: &TimeSeriesTable,
    add: &[String],
    subtract: &[String],
    context: &str,
) -> Result<Vec<f64>> {
    if add.is_empty() && subtract.is_empty() {
        return Err(FeatureError::missing("(no operands)", context));
    }
    let mut out = vec![0.0; table.len()];
    for (names, sign) in [(add, 1.0), (subtract, -1.0)] {
        for name in names {
            let values = table.require(name, context)?;
            for (acc, v) in out.iter_mut().zip(values) {
                *acc += sign * v;
            }
        }
    }
    Ok(out)
}

pub fn sum_columns(table: &TimeSeriesTable, columns: &[String], context: &str) -> Result<Vec<f64>> {
    combine(table, columns, &[], context)
}

pub fn difference(table: &TimeSeriesTable, minuend: &str, subtrahend: &str) -> Result<Vec<f64>> {
    let context = format!("{minuend} - {subtrahend}");
    combine(
        table,
        &[minuend.to_string()],
        &[subtrahend.to_string()],
        &context,
    )
}

pub fn attach_combination(
    table: TimeSeriesTable,
    name: &str,
    add: &[String],
    subtract: &[String],
) -> Result<TimeSeriesTable> {
    let values = combine(&table, add, subtract, name)?;
    table.with_column(name, values)
}

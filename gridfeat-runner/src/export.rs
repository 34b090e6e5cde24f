//! Feature table export.
//!
//! The table is rendered to an in-memory CSV first, so nothing touches the
//! filesystem until every stage has succeeded. Writes go to `<path>.tmp` and
//! are renamed into place. Identical tables render to identical bytes.

use gridfeat_core::table::TimeSeriesTable;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Index timestamp format, e.g. `2022-08-07 00:00:00-07:00`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV writer: {0}")]
    Flush(String),

    #[error("columns '{first}' and '{second}' both export as '{sanitized}'")]
    NameCollision {
        first: String,
        second: String,
        sanitized: String,
    },

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Make a column name underscore-only: whitespace runs and `-` become `_`.
pub fn sanitize_column_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        out.push(if ch == '-' { '_' } else { ch });
    }
    out
}

/// Shortest round-trip text for a value; `NaN` is an empty cell.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        format!("{v}")
    }
}

fn sanitized_header(table: &TimeSeriesTable, index_label: &str) -> Result<Vec<String>, ExportError> {
    let label = sanitize_column_name(index_label);
    let mut seen: Vec<(String, &str)> = Vec::with_capacity(table.width());
    let mut taken = HashSet::with_capacity(table.width() + 1);
    taken.insert(label.clone());

    for name in table.column_names() {
        let sanitized = sanitize_column_name(name);
        if !taken.insert(sanitized.clone()) {
            let first = seen
                .iter()
                .find(|(s, _)| *s == sanitized)
                .map_or_else(|| index_label.to_string(), |(_, original)| original.to_string());
            return Err(ExportError::NameCollision {
                first,
                second: name.to_string(),
                sanitized,
            });
        }
        seen.push((sanitized, name));
    }

    let mut header = Vec::with_capacity(seen.len() + 1);
    header.push(label);
    header.extend(seen.into_iter().map(|(s, _)| s));
    Ok(header)
}

/// Render a table as CSV bytes: index first, then columns in table order.
pub fn render_csv(table: &TimeSeriesTable, index_label: &str) -> Result<Vec<u8>, ExportError> {
    let header = sanitized_header(table, index_label)?;
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(&header)?;

    let columns = table.columns();
    let mut record: Vec<String> = Vec::with_capacity(header.len());
    for (row, ts) in table.index().iter().enumerate() {
        record.clear();
        record.push(ts.format(TIMESTAMP_FORMAT).to_string());
        record.extend(columns.iter().map(|c| format_value(c.values[row])));
        wtr.write_record(&record)?;
    }

    wtr.into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError {
    let path = path.to_path_buf();
    move |source| ExportError::Io { path, source }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(".tmp");
    PathBuf::from(s)
}

/// Write `bytes` to `path` atomically (write to `.tmp`, then rename).
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let tmp = tmp_path(path);
    fs::write(&tmp, bytes).map_err(io_err(&tmp))?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        io_err(path)(source)
    })
}

/// What was written and its content hash.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenArtifact {
    pub path: PathBuf,
    pub bytes: usize,
    /// BLAKE3 of the file contents, hex.
    pub content_hash: String,
}

pub fn write_table(
    table: &TimeSeriesTable,
    path: &Path,
    index_label: &str,
) -> Result<WrittenArtifact, ExportError> {
    let bytes = render_csv(table, index_label)?;
    let content_hash = blake3::hash(&bytes).to_hex().to_string();
    write_atomic(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote feature table");
    Ok(WrittenArtifact {
        path: path.to_path_buf(),
        bytes: bytes.len(),
        content_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};
    use gridfeat_core::table::{TimeIndex, TimeSeriesTable};

    fn sample() -> TimeSeriesTable {
        let pdt = FixedOffset::west_opt(7 * 3600).unwrap();
        let stamps = (0..2)
            .map(|h| {
                Utc.with_ymd_and_hms(2022, 8, 7, 7 + h, 0, 0)
                    .unwrap()
                    .with_timezone(&pdt)
            })
            .collect();
        TimeSeriesTable::new(TimeIndex::new(stamps).unwrap())
            .with_column("RT_LMP", vec![41.25, f64::NAN])
            .unwrap()
            .with_column("NP15_Solar_Renewable Forecast Day Ahead", vec![0.1, 2.0])
            .unwrap()
    }

    #[test]
    fn sanitize_replaces_spaces_and_dashes() {
        assert_eq!(
            sanitize_column_name("HLY-TEMP-NORMAL_USW00023174"),
            "HLY_TEMP_NORMAL_USW00023174"
        );
        assert_eq!(
            sanitize_column_name("Renewable  Forecast\tDay Ahead"),
            "Renewable_Forecast_Day_Ahead"
        );
        assert_eq!(sanitize_column_name("RT_LMP"), "RT_LMP");
    }

    #[test]
    fn values_use_shortest_form_and_blank_nan() {
        assert_eq!(format_value(41.25), "41.25");
        assert_eq!(format_value(50.0), "50");
        assert_eq!(format_value(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_value(f64::NAN), "");
    }

    #[test]
    fn render_layout() {
        let bytes = render_csv(&sample(), "INTERVALSTARTTIME_GMT").unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "INTERVALSTARTTIME_GMT,RT_LMP,NP15_Solar_Renewable_Forecast_Day_Ahead"
        );
        assert_eq!(lines[1], "2022-08-07 00:00:00-07:00,41.25,0.1");
        assert_eq!(lines[2], "2022-08-07 01:00:00-07:00,,2");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn index_label_is_sanitized() {
        let bytes = render_csv(&sample(), "interval start-gmt").unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("interval_start_gmt,RT_LMP,"));

        let t = TimeSeriesTable::new(TimeIndex::default())
            .with_column("time_stamp", vec![])
            .unwrap();
        match render_csv(&t, "time stamp").unwrap_err() {
            ExportError::NameCollision { first, sanitized, .. } => {
                assert_eq!(first, "time stamp");
                assert_eq!(sanitized, "time_stamp");
            }
            other => panic!("expected NameCollision, got {other:?}"),
        }
    }

    #[test]
    fn sanitized_collision_is_an_error() {
        let t = TimeSeriesTable::new(TimeIndex::default())
            .with_column("HLY-TEMP", vec![])
            .unwrap()
            .with_column("HLY TEMP", vec![])
            .unwrap();
        match render_csv(&t, "timestamp").unwrap_err() {
            ExportError::NameCollision { first, second, sanitized } => {
                assert_eq!(first, "HLY-TEMP");
                assert_eq!(second, "HLY TEMP");
                assert_eq!(sanitized, "HLY_TEMP");
            }
            other => panic!("expected NameCollision, got {other:?}"),
        }
    }

    #[test]
    fn write_is_atomic_and_hashed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        let artifact = write_table(&sample(), &path, "timestamp").unwrap();

        let on_disk = fs::read(&path).unwrap();
        assert_eq!(artifact.bytes, on_disk.len());
        assert_eq!(artifact.content_hash, blake3::hash(&on_disk).to_hex().to_string());
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = render_csv(&sample(), "timestamp").unwrap();
        let b = render_csv(&sample(), "timestamp").unwrap();
        assert_eq!(a, b);
    }
}

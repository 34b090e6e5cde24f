//! Series loader: concatenate a directory of same-schema CSV files.
//!
//! Every column is read as text so that files whose numeric columns would be
//! inferred differently still stack; numbers are parsed when the record set is
//! turned into long-format records.

use crate::data::timestamp::TimestampFormat;
use crate::error::{FeatureError, Result};
use crate::table::Timestamp;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Expected column layout of a source directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSchema {
    /// Exact ordered column list. `None` means the first file defines it.
    pub columns: Option<Vec<String>>,
}

impl RecordSchema {
    pub fn infer() -> Self {
        Self { columns: None }
    }

    pub fn exact<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: Some(columns.iter().map(|c| c.as_ref().to_string()).collect()),
        }
    }
}

/// The concatenated rows of every CSV file of one source.
#[derive(Debug, Clone)]
pub struct RecordSet {
    frame: DataFrame,
    files: usize,
}

/// Load and concatenate every `*.csv` file directly inside `dir`.
///
/// Files are read in file-name order. Each file's header must equal the
/// expected column list exactly, otherwise the load fails with
/// `SchemaMismatch`; no reconciliation is attempted.
pub fn load_dir(dir: &Path, schema: &RecordSchema) -> Result<RecordSet> {
    let files = csv_files(dir)?;
    if files.is_empty() {
        return Err(FeatureError::NoInputFiles {
            dir: dir.to_path_buf(),
        });
    }

    let mut expected = schema.columns.clone();
    let mut frame: Option<DataFrame> = None;

    for path in &files {
        let df = read_csv_as_text(path)?;
        let found = column_names(&df);

        match &expected {
            Some(cols) if *cols != found => {
                return Err(FeatureError::SchemaMismatch {
                    file: path.clone(),
                    expected: cols.clone(),
                    found,
                });
            }
            Some(_) => {}
            None => expected = Some(found),
        }

        debug!(file = %path.display(), rows = df.height(), "read source file");

        frame = Some(match frame.take() {
            None => df,
            Some(mut acc) => {
                acc.vstack_mut(&df).map_err(|e| FeatureError::Read {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                acc
            }
        });
    }

    let frame = frame.unwrap_or_default();
    Ok(RecordSet {
        frame,
        files: files.len(),
    })
}

/// Sorted list of CSV files in `dir` (non-recursive).
fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_csv_as_text(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| FeatureError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.as_str().to_string())
        .collect()
}

/// How to read long-format records out of a record set.
#[derive(Debug, Clone, PartialEq)]
pub struct LongSpec {
    pub timestamp_column: String,
    pub timestamp_format: TimestampFormat,
    /// Categorical columns whose values name the pivoted columns.
    pub key_columns: Vec<String>,
    /// Numeric columns carried by each record.
    pub value_columns: Vec<String>,
    /// Exact value substitutions applied after parsing (`from`, `to`).
    pub replacements: Vec<(f64, f64)>,
}

/// One long-format row: timestamp, key tuple, one value per value column.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRecord {
    pub timestamp: Timestamp,
    pub keys: Vec<String>,
    pub values: Vec<f64>,
}

impl RecordSet {
    /// Number of rows across all files.
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Number of files that were concatenated.
    pub fn file_count(&self) -> usize {
        self.files
    }

    pub fn column_names(&self) -> Vec<String> {
        column_names(&self.frame)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    fn text_column(&self, name: &str, context: &str) -> Result<&StringChunked> {
        self.frame
            .column(name)
            .map_err(|_| FeatureError::missing(name, context))?
            .str()
            .map_err(|e| FeatureError::RecordSet(format!("column '{name}': {e}")))
    }

    /// Return a new record set holding only rows whose `column` value is one
    /// of `values`.
    pub fn filter_in<S: AsRef<str>>(&self, column: &str, values: &[S]) -> Result<RecordSet> {
        let ca = self.text_column(column, "record filter")?;
        let mask: BooleanChunked = ca
            .into_iter()
            .map(|v| Some(v.is_some_and(|s| values.iter().any(|x| x.as_ref() == s))))
            .collect();
        let frame = self
            .frame
            .filter(&mask)
            .map_err(|e| FeatureError::RecordSet(format!("filter on '{column}': {e}")))?;
        Ok(RecordSet {
            frame,
            files: self.files,
        })
    }

    /// Parse the record set into long-format records.
    ///
    /// Blank or non-numeric values become `NaN`. A yearless timestamp format
    /// yields one record per configured year.
    pub fn to_long(&self, spec: &LongSpec) -> Result<Vec<LongRecord>> {
        let stamps: Vec<Option<&str>> = self
            .text_column(&spec.timestamp_column, "timestamp")?
            .into_iter()
            .collect();
        let keys = spec
            .key_columns
            .iter()
            .map(|c| Ok(self.text_column(c, "pivot key")?.into_iter().collect()))
            .collect::<Result<Vec<Vec<Option<&str>>>>>()?;
        let values = spec
            .value_columns
            .iter()
            .map(|c| Ok(self.text_column(c, "value")?.into_iter().collect()))
            .collect::<Result<Vec<Vec<Option<&str>>>>>()?;

        let mut records = Vec::with_capacity(stamps.len());
        for (row, raw_ts) in stamps.iter().enumerate() {
            let raw_ts = raw_ts.unwrap_or("");
            let timestamps =
                spec.timestamp_format
                    .parse(raw_ts)
                    .map_err(|reason| FeatureError::TimestampParse {
                        column: spec.timestamp_column.clone(),
                        value: raw_ts.to_string(),
                        reason,
                    })?;

            let key: Vec<String> = keys
                .iter()
                .map(|col| col[row].unwrap_or("").to_string())
                .collect();
            let vals: Vec<f64> = values
                .iter()
                .map(|col| parse_value(col[row], &spec.replacements))
                .collect();

            for timestamp in timestamps {
                records.push(LongRecord {
                    timestamp,
                    keys: key.clone(),
                    values: vals.clone(),
                });
            }
        }
        Ok(records)
    }
}

fn parse_value(raw: Option<&str>, replacements: &[(f64, f64)]) -> f64 {
    let v = raw
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN);
    replacements
        .iter()
        .find(|(from, _)| *from == v)
        .map_or(v, |&(_, to)| to)
}

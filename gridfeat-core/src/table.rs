//! Time series table: the data structure every stage consumes and produces.
//!
//! A table is a strictly ascending timestamp index plus named `f64` columns of
//! the same length. `NaN` marks a missing cell. Tables are never mutated in
//! place: every transform takes a table (by reference or by value) and returns
//! a new one.

use crate::error::{FeatureError, Result};
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::{BTreeMap, HashMap};

/// Timezone-aware timestamp. Equality, ordering and lookup are by instant.
pub type Timestamp = DateTime<FixedOffset>;

/// Lookup key for a timestamp: milliseconds since the Unix epoch.
fn instant_key(ts: &Timestamp) -> i64 {
    ts.timestamp_millis()
}

/// Convert a UTC datetime into the table timestamp type.
pub fn utc(ts: DateTime<Utc>) -> Timestamp {
    ts.fixed_offset()
}

/// Ordered timestamp index with O(1) position lookup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeIndex {
    stamps: Vec<Timestamp>,
    positions: HashMap<i64, usize>,
}

impl TimeIndex {
    /// Build an index from timestamps that must already be strictly ascending.
    pub fn new(stamps: Vec<Timestamp>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(stamps.len());
        for (i, ts) in stamps.iter().enumerate() {
            if i > 0 && stamps[i - 1] >= *ts {
                return Err(FeatureError::UnorderedIndex { position: i });
            }
            positions.insert(instant_key(ts), i);
        }
        Ok(Self { stamps, positions })
    }

    /// Build an index from arbitrary timestamps, sorting and collapsing
    /// duplicates. When two stamps denote the same instant the first one wins.
    pub fn from_unsorted(stamps: impl IntoIterator<Item = Timestamp>) -> Self {
        let mut ordered: BTreeMap<i64, Timestamp> = BTreeMap::new();
        for ts in stamps {
            ordered.entry(instant_key(&ts)).or_insert(ts);
        }
        let stamps: Vec<Timestamp> = ordered.into_values().collect();
        let positions = stamps
            .iter()
            .enumerate()
            .map(|(i, ts)| (instant_key(ts), i))
            .collect();
        Self { stamps, positions }
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn as_slice(&self) -> &[Timestamp] {
        &self.stamps
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timestamp> {
        self.stamps.iter()
    }

    pub fn first(&self) -> Option<&Timestamp> {
        self.stamps.first()
    }

    pub fn last(&self) -> Option<&Timestamp> {
        self.stamps.last()
    }

    /// Row position of the given instant, if present.
    pub fn position(&self, ts: &Timestamp) -> Option<usize> {
        self.positions.get(&instant_key(ts)).copied()
    }

    pub fn contains(&self, ts: &Timestamp) -> bool {
        self.positions.contains_key(&instant_key(ts))
    }
}

/// A named column of values aligned with a table index.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Wide time series table: one row per timestamp, one column per feature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeriesTable {
    index: TimeIndex,
    columns: Vec<Column>,
    by_name: HashMap<String, usize>,
}

impl TimeSeriesTable {
    /// A table with the given index and no columns.
    pub fn new(index: TimeIndex) -> Self {
        Self {
            index,
            columns: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Assemble a table, checking column lengths and name uniqueness.
    pub fn from_columns(index: TimeIndex, columns: Vec<Column>) -> Result<Self> {
        columns
            .into_iter()
            .try_fold(Self::new(index), |table, col| {
                table.with_column(col.name, col.values)
            })
    }

    /// Return a new table with one more column appended.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(FeatureError::LengthMismatch {
                column: name,
                expected: self.index.len(),
                actual: values.len(),
            });
        }
        if self.by_name.contains_key(&name) {
            return Err(FeatureError::DuplicateColumn(name));
        }
        self.by_name.insert(name.clone(), self.columns.len());
        self.columns.push(Column { name, values });
        Ok(self)
    }

    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.by_name
            .get(name)
            .map(|&i| self.columns[i].values.as_slice())
    }

    /// Like [`column`](Self::column) but fails with `MissingColumn`, naming
    /// the feature that needed it.
    pub fn require(&self, name: &str, context: &str) -> Result<&[f64]> {
        self.column(name)
            .ok_or_else(|| FeatureError::missing(name, context))
    }

    /// Value of `column` at the given instant. `None` if either is absent.
    pub fn value(&self, ts: &Timestamp, column: &str) -> Option<f64> {
        let row = self.index.position(ts)?;
        self.column(column).map(|values| values[row])
    }

    /// Return a new table with every column renamed by `rename`.
    pub fn rename_columns(self, rename: impl Fn(&str) -> String) -> Result<Self> {
        let columns = self
            .columns
            .into_iter()
            .map(|c| Column::new(rename(&c.name), c.values))
            .collect();
        Self::from_columns(self.index, columns)
    }

    /// Return a new table whose timestamps are mapped through `f`.
    ///
    /// `f` must preserve the instant ordering (offset changes, for example);
    /// the rebuilt index is validated.
    pub fn map_index(self, f: impl Fn(&Timestamp) -> Timestamp) -> Result<Self> {
        let stamps = self.index.iter().map(f).collect();
        let index = TimeIndex::new(stamps)?;
        Ok(Self {
            index,
            columns: self.columns,
            by_name: self.by_name,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use chrono::TimeZone;

    /// UTC timestamp for 2024-01-01 plus `hour` hours.
    pub fn hour(h: i64) -> Timestamp {
        utc(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(h))
    }

    /// UTC timestamp for 2024-01-01 plus `minutes` minutes.
    pub fn minute(m: i64) -> Timestamp {
        utc(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(m))
    }

    /// One-column hourly table starting at `start_hour`.
    pub fn hourly(name: &str, start_hour: i64, values: &[f64]) -> TimeSeriesTable {
        let index = TimeIndex::new(
            (0..values.len() as i64).map(|i| hour(start_hour + i)).collect(),
        )
        .unwrap();
        TimeSeriesTable::new(index)
            .with_column(name, values.to_vec())
            .unwrap()
    }
}

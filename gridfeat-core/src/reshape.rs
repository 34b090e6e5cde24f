//! Long ↔ wide reshaping.
//!
//! `pivot` turns one-row-per-(timestamp, key) records into a wide table with
//! one column per distinct key tuple. Duplicate (timestamp, key) pairs are an
//! error: dropping either record would silently change the result. So are two
//! distinct key tuples whose joined names coincide (`A_B`+`C` and `A`+`B_C`).

use crate::data::LongRecord;
use crate::error::{FeatureError, Result};
use crate::table::{Column, TimeIndex, TimeSeriesTable, Timestamp};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Column name for a key tuple. With several value columns the value name is
/// prepended, e.g. `HLY-TEMP-NORMAL_USW00023174`.
fn column_name(keys: &[String], value_name: &str, multi_value: bool) -> String {
    let joined = keys.join("_");
    if keys.is_empty() {
        value_name.to_string()
    } else if multi_value {
        format!("{value_name}_{joined}")
    } else {
        joined
    }
}

/// Pivot long-format records into a wide table.
///
/// `value_names` names the value slots carried by every record. Rows are
/// ascending by instant and columns are ordered by name. A key tuple with no
/// record at some timestamp leaves `NaN` there.
pub fn pivot(records: &[LongRecord], value_names: &[String]) -> Result<TimeSeriesTable> {
    let index = TimeIndex::from_unsorted(records.iter().map(|r| r.timestamp));
    let multi_value = value_names.len() > 1;
    let rows = index.len();

    let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut seen: HashSet<(usize, Vec<String>)> = HashSet::with_capacity(records.len());
    // column name -> (value name, key tuple) that first produced it
    let mut origins: HashMap<String, (&str, &[String])> = HashMap::new();

    for record in records {
        if record.values.len() != value_names.len() {
            return Err(FeatureError::LengthMismatch {
                column: record.keys.join("_"),
                expected: value_names.len(),
                actual: record.values.len(),
            });
        }
        let row = index
            .position(&record.timestamp)
            .ok_or_else(|| FeatureError::RecordSet("pivot index lost a timestamp".into()))?;

        if !seen.insert((row, record.keys.clone())) {
            return Err(FeatureError::DuplicateKey {
                timestamp: record.timestamp.to_rfc3339(),
                key: record.keys.join("_"),
            });
        }

        for (value_name, &value) in value_names.iter().zip(&record.values) {
            let name = column_name(&record.keys, value_name, multi_value);
            let origin = *origins
                .entry(name.clone())
                .or_insert((value_name.as_str(), record.keys.as_slice()));
            if origin != (value_name.as_str(), record.keys.as_slice()) {
                return Err(FeatureError::DuplicateColumn(name));
            }
            columns.entry(name).or_insert_with(|| vec![f64::NAN; rows])[row] = value;
        }
    }

    debug!(rows, columns = columns.len(), "pivoted long records");

    let columns = columns
        .into_iter()
        .map(|(name, values)| Column::new(name, values))
        .collect();
    TimeSeriesTable::from_columns(index, columns)
}

/// Inverse of a single-value pivot: one `(timestamp, column, value)` triple
/// per non-missing cell, row-major.
pub fn melt(table: &TimeSeriesTable) -> Vec<(Timestamp, String, f64)> {
    let mut out = Vec::new();
    for (row, ts) in table.index().iter().enumerate() {
        for col in table.columns() {
            let v = col.values[row];
            if !v.is_nan() {
                out.push((*ts, col.name.clone(), v));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_util::minute;

    fn rec(m: i64, keys: &[&str], values: &[f64]) -> LongRecord {
        LongRecord {
            timestamp: minute(m),
            keys: keys.iter().map(|k| k.to_string()).collect(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn pivot_single_key() {
        let records = vec![
            rec(5, &["LMP"], &[31.0]),
            rec(0, &["LMP"], &[30.0]),
            rec(0, &["MCC"], &[1.0]),
        ];
        let t = pivot(&records, &["VALUE".into()]).unwrap();

        assert_eq!(t.len(), 2);
        assert_eq!(t.column_names().collect::<Vec<_>>(), vec!["LMP", "MCC"]);
        assert_eq!(t.column("LMP").unwrap(), &[30.0, 31.0]);
        assert_eq!(t.column("MCC").unwrap()[0], 1.0);
        assert!(t.column("MCC").unwrap()[1].is_nan());
    }

    #[test]
    fn pivot_multi_key_joins_with_underscore() {
        let records = vec![rec(
            0,
            &["NP15", "Solar", "Renewable Forecast Day Ahead"],
            &[120.0],
        )];
        let t = pivot(&records, &["MW".into()]).unwrap();
        assert!(t.has_column("NP15_Solar_Renewable Forecast Day Ahead"));
    }

    #[test]
    fn pivot_multi_value_prefixes_value_name() {
        let records = vec![rec(0, &["USW00023174"], &[2.5, 68.0])];
        let names = vec!["HLY-CLDH-NORMAL".to_string(), "HLY-TEMP-NORMAL".to_string()];
        let t = pivot(&records, &names).unwrap();
        assert_eq!(
            t.column_names().collect::<Vec<_>>(),
            vec!["HLY-CLDH-NORMAL_USW00023174", "HLY-TEMP-NORMAL_USW00023174"]
        );
    }

    #[test]
    fn duplicate_key_is_an_error() {
        let records = vec![rec(0, &["LMP"], &[30.0]), rec(0, &["LMP"], &[99.0])];
        let err = pivot(&records, &["VALUE".into()]).unwrap_err();
        match err {
            FeatureError::DuplicateKey { key, .. } => assert_eq!(key, "LMP"),
            other => panic!("expected DuplicateKey, got {other:?}"),
        }
    }

    #[test]
    fn distinct_tuples_with_same_joined_name_are_rejected() {
        let records = vec![rec(0, &["A_B", "C"], &[1.0]), rec(0, &["A", "B_C"], &[2.0])];
        match pivot(&records, &["VALUE".into()]).unwrap_err() {
            FeatureError::DuplicateColumn(name) => assert_eq!(name, "A_B_C"),
            other => panic!("expected DuplicateColumn, got {other:?}"),
        }

        // also across timestamps, where no cell is overwritten
        let records = vec![rec(0, &["A_B", "C"], &[1.0]), rec(5, &["A", "B_C"], &[2.0])];
        assert!(matches!(
            pivot(&records, &["VALUE".into()]),
            Err(FeatureError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn same_key_different_offsets_same_instant_collide() {
        let pacific = chrono::FixedOffset::west_opt(7 * 3600).unwrap();
        let mut second = rec(0, &["LMP"], &[2.0]);
        second.timestamp = second.timestamp.with_timezone(&pacific);
        let records = vec![rec(0, &["LMP"], &[1.0]), second];
        assert!(pivot(&records, &["VALUE".into()]).is_err());
    }

    #[test]
    fn melt_skips_missing_cells() {
        let records = vec![rec(0, &["A"], &[1.0]), rec(5, &["B"], &[2.0])];
        let t = pivot(&records, &["VALUE".into()]).unwrap();
        let melted = melt(&t);
        assert_eq!(
            melted,
            vec![(minute(0), "A".to_string(), 1.0), (minute(5), "B".to_string(), 2.0)]
        );
    }
}

//! Lag/lead column generation by exact timestamp lookup.
//!
//! The value attached at T is the source value at `T + offset_hours`:
//! negative offsets read the past (model inputs), positive offsets read the
//! future (training targets). Lookups are exact; a shifted timestamp that is
//! not in the index yields `NaN` rather than the nearest neighbour, as does an
//! offset that leaves chrono's representable range.
//!
//! Shifts do not compose on an irregular index: shifting by `a` then by `b`
//! equals shifting by `a + b` only when every intermediate hour is present.

use crate::error::Result;
use crate::table::TimeSeriesTable;
use chrono::TimeDelta;

/// Values of `column` looked up at `T + offset_hours` for every index row T.
pub fn shift(table: &TimeSeriesTable, column: &str, offset_hours: i64) -> Result<Vec<f64>> {
    let source = table.require(column, "shift")?;
    if offset_hours == 0 {
        return Ok(source.to_vec());
    }
    let index = table.index();
    let Some(delta) = TimeDelta::try_hours(offset_hours) else {
        return Ok(vec![f64::NAN; index.len()]);
    };

    Ok(index
        .iter()
        .map(|ts| {
            ts.checked_add_signed(delta)
                .and_then(|target| index.position(&target))
                .map_or(f64::NAN, |row| source[row])
        })
        .collect())
}

/// Default column name for a shifted feature.
///
/// `lagged_2hr_RT_LMP` for offset -2, `RT_LMP_in_12_hrs` for offset 12.
pub fn shift_name(column: &str, offset_hours: i64) -> String {
    if offset_hours < 0 {
        format!("lagged_{}hr_{column}", offset_hours.unsigned_abs())
    } else {
        format!("{column}_in_{offset_hours}_hrs")
    }
}

/// Return a new table with the shifted column attached as `name`.
pub fn attach_shift(
    table: TimeSeriesTable,
    column: &str,
    offset_hours: i64,
    name: &str,
) -> Result<TimeSeriesTable> {
    let values = shift(&table, column, offset_hours)?;
    table.with_column(name, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatureError;
    use crate::table::test_util::{hour, hourly};
    use crate::table::TimeIndex;

    #[test]
    fn negative_offset_reads_the_past() {
        let t = hourly("RT_LMP", 0, &[1.0, 2.0, 3.0, 4.0]);
        let lagged = shift(&t, "RT_LMP", -2).unwrap();
        assert!(lagged[0].is_nan());
        assert!(lagged[1].is_nan());
        assert_eq!(&lagged[2..], &[1.0, 2.0]);
    }

    #[test]
    fn positive_offset_reads_the_future() {
        let t = hourly("DA_LMP", 0, &[1.0, 2.0, 3.0, 4.0]);
        let lead = shift(&t, "DA_LMP", 2).unwrap();
        assert_eq!(&lead[..2], &[3.0, 4.0]);
        assert!(lead[2].is_nan() && lead[3].is_nan());
    }

    #[test]
    fn zero_offset_is_identity() {
        let t = hourly("x", 0, &[5.0, f64::NAN, 7.0]);
        let same = shift(&t, "x", 0).unwrap();
        assert_eq!(same[0], 5.0);
        assert!(same[1].is_nan());
        assert_eq!(same[2], 7.0);
    }

    #[test]
    fn gaps_yield_nan_not_neighbour() {
        // hours 0, 1, 3 (hour 2 missing)
        let index = TimeIndex::new(vec![hour(0), hour(1), hour(3)]).unwrap();
        let t = TimeSeriesTable::new(index)
            .with_column("x", vec![10.0, 11.0, 13.0])
            .unwrap();
        let lagged = shift(&t, "x", -1).unwrap();
        assert!(lagged[0].is_nan());
        assert_eq!(lagged[1], 10.0);
        assert!(lagged[2].is_nan());
    }

    #[test]
    fn composition_differs_on_irregular_index() {
        let index = TimeIndex::new(vec![hour(0), hour(2)]).unwrap();
        let t = TimeSeriesTable::new(index)
            .with_column("x", vec![1.0, 3.0])
            .unwrap();

        let direct = shift(&t, "x", -2).unwrap();
        let once = attach_shift(t, "x", -1, "x_1").unwrap();
        let twice = shift(&once, "x_1", -1).unwrap();

        assert_eq!(direct[1], 1.0);
        assert!(twice[1].is_nan());
    }

    #[test]
    fn missing_source_column() {
        let t = hourly("x", 0, &[1.0]);
        assert!(matches!(
            shift(&t, "y", -1),
            Err(FeatureError::MissingColumn { .. })
        ));
    }

    #[test]
    fn names_follow_direction() {
        assert_eq!(shift_name("RT_LMP", -2), "lagged_2hr_RT_LMP");
        assert_eq!(shift_name("DA_LMP", 12), "DA_LMP_in_12_hrs");
        assert_eq!(
            shift_name("x", i64::MIN),
            "lagged_9223372036854775808hr_x"
        );
    }

    #[test]
    fn out_of_range_offsets_yield_nan() {
        let t = hourly("x", 0, &[1.0, 2.0]);
        for offset in [3_000_000_000, -3_000_000_000, i64::MAX, i64::MIN] {
            let shifted = shift(&t, "x", offset).unwrap();
            assert_eq!(shifted.len(), 2);
            assert!(shifted.iter().all(|v| v.is_nan()), "offset {offset}");
        }
    }
}

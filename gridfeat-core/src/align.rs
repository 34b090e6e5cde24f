//! Multi-source time alignment.
//!
//! Sources are joined on a single canonical UTC index with inner-join
//! semantics: only timestamps present in every input survive. Unlike a
//! union-and-fill alignment, no rows are synthesized, so a gap in any source
//! removes that hour from the feature table.

use crate::error::{FeatureError, Result};
use crate::table::{Column, TimeIndex, TimeSeriesTable, Timestamp};
use chrono::Utc;
use tracing::debug;

/// A wide table tagged with the source name used in error messages.
#[derive(Debug, Clone)]
pub struct NamedTable {
    pub name: String,
    pub table: TimeSeriesTable,
}

impl NamedTable {
    pub fn new(name: impl Into<String>, table: TimeSeriesTable) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }
}

/// Prefix every column name so tables from different sources cannot collide.
pub fn namespace(table: TimeSeriesTable, prefix: &str) -> Result<TimeSeriesTable> {
    if prefix.is_empty() {
        return Ok(table);
    }
    table.rename_columns(|c| format!("{prefix}{c}"))
}

fn to_utc(ts: &Timestamp) -> Timestamp {
    ts.with_timezone(&Utc).fixed_offset()
}

/// Inner-join `inputs` in order on their timestamps.
///
/// Every index is normalized to UTC before comparison, so inputs may carry
/// different offsets. The output holds the intersection of all indices
/// (ascending, UTC) and every input's columns in input order.
///
/// Fails with `EmptyJoinResult` naming the first input after which no
/// timestamp remains, and with `DuplicateColumn` if two inputs share a column
/// name.
pub fn inner_join(inputs: &[NamedTable]) -> Result<TimeSeriesTable> {
    let Some(first) = inputs.first() else {
        return Err(FeatureError::EmptyJoinResult {
            table: "(no inputs)".into(),
        });
    };

    let mut surviving: Vec<Timestamp> = first.table.index().iter().map(to_utc).collect();
    if surviving.is_empty() {
        return Err(FeatureError::EmptyJoinResult {
            table: first.name.clone(),
        });
    }

    for input in &inputs[1..] {
        let before = surviving.len();
        surviving.retain(|ts| input.table.index().contains(ts));
        debug!(
            table = %input.name,
            kept = surviving.len(),
            dropped = before - surviving.len(),
            "joined source"
        );
        if surviving.is_empty() {
            return Err(FeatureError::EmptyJoinResult {
                table: input.name.clone(),
            });
        }
    }

    let index = TimeIndex::new(surviving)?;
    let mut joined = TimeSeriesTable::new(index.clone());

    for input in inputs {
        let positions: Vec<usize> = index
            .iter()
            .map(|ts| {
                input.table.index().position(ts).ok_or_else(|| {
                    FeatureError::EmptyJoinResult {
                        table: input.name.clone(),
                    }
                })
            })
            .collect::<Result<_>>()?;

        for Column { name, values } in input.table.columns() {
            let taken = positions.iter().map(|&p| values[p]).collect();
            joined = joined.with_column(name.clone(), taken)?;
        }
    }

    Ok(joined)
}

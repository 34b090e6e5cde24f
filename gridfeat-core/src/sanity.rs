//! Simple consistency ratios over raw wide tables.
//!
//! These are diagnostics only; callers log them and carry on.

use crate::error::Result;
use crate::table::TimeSeriesTable;

/// Share of rows where `|total − Σ components| < tolerance`.
///
/// Missing component cells count as zero; a missing total never matches.
/// Returns `None` for an empty table.
pub fn component_sum_ratio(
    table: &TimeSeriesTable,
    total: &str,
    components: &[String],
    tolerance: f64,
) -> Result<Option<f64>> {
    let context = format!("component check on {total}");
    let totals = table.require(total, &context)?;
    let parts = components
        .iter()
        .map(|c| table.require(c, &context))
        .collect::<Result<Vec<_>>>()?;

    if totals.is_empty() {
        return Ok(None);
    }

    let matching = totals
        .iter()
        .enumerate()
        .filter(|&(row, &t)| {
            let sum: f64 = parts
                .iter()
                .map(|p| p[row])
                .filter(|v| !v.is_nan())
                .sum();
            (t - sum).abs() < tolerance
        })
        .count();

    Ok(Some(matching as f64 / totals.len() as f64))
}

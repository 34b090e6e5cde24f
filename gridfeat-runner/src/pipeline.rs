//! Pipeline orchestration.
//!
//! Stages run in a fixed order: every source is loaded, filtered, pivoted,
//! checked and (optionally) resampled; the sources are inner-joined in
//! configuration order; the joined index is localized; features are attached;
//! and the table is written exactly once, at the very end. Any error aborts
//! the run before the output file is touched.

use gridfeat_core::align::{inner_join, namespace, NamedTable};
use gridfeat_core::data::load_dir;
use gridfeat_core::error::FeatureError;
use gridfeat_core::features::{
    attach_calendar, attach_combination, attach_cyclical, attach_shift, attach_threshold,
    shift_name,
};
use gridfeat_core::reshape::pivot;
use gridfeat_core::resample::resample_hourly;
use gridfeat_core::sanity::component_sum_ratio;
use gridfeat_core::table::TimeSeriesTable;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{CheckConfig, ConfigError, FeatureConfig, PipelineConfig, SourceConfig};
use crate::export::{write_table, ExportError, TIMESTAMP_FORMAT};

/// Errors from a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("source '{name}': {error}")]
    Source {
        name: String,
        #[source]
        error: FeatureError,
    },

    #[error("feature error: {0}")]
    Feature(#[from] FeatureError),

    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

/// Per-source row and column counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceSummary {
    pub name: String,
    pub files: usize,
    /// Rows read across all files, before filtering.
    pub raw_rows: usize,
    /// Rows of the wide table handed to the join.
    pub rows: usize,
    pub columns: usize,
}

/// Outcome of one component-sum check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckSummary {
    pub source: String,
    pub total: String,
    /// `None` when the checked table was empty.
    pub ratio: Option<f64>,
    pub passed: bool,
}

/// Everything a caller needs to know about a finished run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub output: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
    pub bytes: usize,
    /// BLAKE3 of the written file.
    pub content_hash: String,
    pub sources: Vec<SourceSummary>,
    pub checks: Vec<CheckSummary>,
}

/// Run the whole pipeline once and write the feature table.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunSummary, PipelineError> {
    config.validate()?;
    let tz = config.output.tz()?;

    let mut tables = Vec::with_capacity(config.sources.len());
    let mut source_summaries = Vec::with_capacity(config.sources.len());
    let mut check_summaries = Vec::new();

    for source in &config.sources {
        let checks: Vec<&CheckConfig> = config
            .checks
            .iter()
            .filter(|c| c.source == source.name)
            .collect();
        let built = build_source(source, &checks).map_err(|error| PipelineError::Source {
            name: source.name.clone(),
            error,
        })?;
        source_summaries.push(built.summary);
        check_summaries.extend(built.checks);
        tables.push(NamedTable::new(source.name.clone(), built.table));
    }

    let joined = inner_join(&tables)?;
    drop(tables);
    info!(rows = joined.len(), columns = joined.width(), "joined sources");

    let localized = joined.map_index(|ts| ts.with_timezone(&tz).fixed_offset())?;
    let featured = apply_features(localized, &config.features)?;
    info!(columns = featured.width(), "derived features");

    let artifact = write_table(&featured, &config.output.path, &config.output.index_label)?;
    info!(
        path = %artifact.path.display(),
        rows = featured.len(),
        hash = %artifact.content_hash,
        "wrote feature table"
    );

    let stamp = |ts: Option<&gridfeat_core::table::Timestamp>| {
        ts.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
    };
    Ok(RunSummary {
        output: artifact.path,
        rows: featured.len(),
        columns: featured.width(),
        first_timestamp: stamp(featured.index().first()),
        last_timestamp: stamp(featured.index().last()),
        bytes: artifact.bytes,
        content_hash: artifact.content_hash,
        sources: source_summaries,
        checks: check_summaries,
    })
}

struct BuiltSource {
    table: TimeSeriesTable,
    summary: SourceSummary,
    checks: Vec<CheckSummary>,
}

fn build_source(
    source: &SourceConfig,
    checks: &[&CheckConfig],
) -> Result<BuiltSource, FeatureError> {
    let raw = load_dir(&source.dir, &source.schema())?;
    let raw_rows = raw.height();
    let files = raw.file_count();

    let mut records = raw;
    for filter in &source.filters {
        records = records.filter_in(&filter.column, &filter.values)?;
    }
    debug!(
        source = %source.name,
        raw_rows,
        kept = records.height(),
        "filtered records"
    );

    let long = records.to_long(&source.long_spec())?;
    let pivoted = pivot(&long, &source.value_columns)?;
    let wide = match &source.rename {
        Some(name) => pivoted.rename_columns(|_| name.clone())?,
        None => namespace(pivoted, &source.prefix)?,
    };

    let mut check_summaries = Vec::with_capacity(checks.len());
    for check in checks {
        let ratio = component_sum_ratio(&wide, &check.total, &check.components, check.tolerance)?;
        let passed = ratio.is_some_and(|r| r >= check.min_ratio);
        if passed {
            info!(source = %source.name, total = %check.total, ratio = ?ratio, "component check");
        } else {
            warn!(
                source = %source.name,
                total = %check.total,
                ratio = ?ratio,
                min_ratio = check.min_ratio,
                "component check below minimum"
            );
        }
        check_summaries.push(CheckSummary {
            source: source.name.clone(),
            total: check.total.clone(),
            ratio,
            passed,
        });
    }

    let table = if source.resample {
        resample_hourly(&wide)?
    } else {
        wide
    };
    info!(
        source = %source.name,
        files,
        rows = table.len(),
        columns = table.width(),
        "loaded source"
    );

    Ok(BuiltSource {
        summary: SourceSummary {
            name: source.name.clone(),
            files,
            raw_rows,
            rows: table.len(),
            columns: table.width(),
        },
        table,
        checks: check_summaries,
    })
}

/// Attach every configured feature: calendar, cyclical, aggregates,
/// thresholds, lags, then named shifts.
pub fn apply_features(
    table: TimeSeriesTable,
    features: &FeatureConfig,
) -> Result<TimeSeriesTable, FeatureError> {
    let mut table = table;

    if let Some(calendar) = &features.calendar {
        table = attach_calendar(table, &calendar.names())?;
    }
    for c in &features.cyclical {
        table = attach_cyclical(table, &c.column, c.period)?;
    }
    for a in &features.aggregates {
        table = attach_combination(table, &a.name, &a.add, &a.subtract)?;
    }
    for t in &features.thresholds {
        table = attach_threshold(table, &t.column, t.threshold, &t.output_name())?;
    }
    for group in &features.lags {
        for column in &group.columns {
            for &offset in &group.offsets {
                table = attach_shift(table, column, offset, &shift_name(column, offset))?;
            }
        }
    }
    for s in &features.shifts {
        table = attach_shift(table, &s.column, s.offset_hours, &s.output_name())?;
    }

    Ok(table)
}

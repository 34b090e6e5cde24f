//! Serializable pipeline configuration.
//!
//! A pipeline file names the output artifact, the raw sources to load and
//! join (in join order), optional consistency checks, and the features to
//! derive on the joined table.

use gridfeat_core::data::{LongSpec, RecordSchema, TimestampFormat};
use gridfeat_core::features::CalendarNames;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading or validating a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Largest accepted lag or lead, in hours (about a century).
pub const MAX_SHIFT_HOURS: i64 = 24 * 366 * 100;

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

/// Complete description of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    pub output: OutputConfig,

    /// Raw sources, joined in this order.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Component-sum checks run on a source's wide table before resampling.
    #[serde(default)]
    pub checks: Vec<CheckConfig>,

    #[serde(default)]
    pub features: FeatureConfig,
}

/// Where and how the feature table is written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    pub path: PathBuf,

    /// IANA zone the UTC index is converted to before calendar features.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Header of the timestamp column.
    #[serde(default = "default_index_label")]
    pub index_label: String,
}

fn default_timezone() -> String {
    "America/Los_Angeles".into()
}

fn default_index_label() -> String {
    "timestamp".into()
}

impl OutputConfig {
    pub fn tz(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| invalid(format!("unknown timezone '{}': {e}", self.timezone)))
    }
}

/// One raw source directory and how to turn it into a wide hourly table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    /// Name used in logs and join errors.
    pub name: String,
    pub dir: PathBuf,

    /// Expected header; the first file defines it when absent.
    #[serde(default)]
    pub columns: Option<Vec<String>>,

    pub timestamp_column: String,
    #[serde(default)]
    pub timestamp_format: TimestampFormat,

    /// Row filters applied before pivoting.
    #[serde(default)]
    pub filters: Vec<FilterConfig>,

    #[serde(default)]
    pub pivot_keys: Vec<String>,
    pub value_columns: Vec<String>,

    /// Prepended to every pivoted column name.
    #[serde(default)]
    pub prefix: String,

    /// Average sub-hourly records into hourly buckets.
    #[serde(default)]
    pub resample: bool,

    #[serde(default)]
    pub replacements: Vec<Replacement>,

    /// Output name for the single value column of a source with no pivot
    /// keys, used instead of `{prefix}{value}`.
    #[serde(default)]
    pub rename: Option<String>,
}

impl SourceConfig {
    pub fn schema(&self) -> RecordSchema {
        match &self.columns {
            Some(cols) => RecordSchema::exact(cols),
            None => RecordSchema::infer(),
        }
    }

    pub fn long_spec(&self) -> LongSpec {
        LongSpec {
            timestamp_column: self.timestamp_column.clone(),
            timestamp_format: self.timestamp_format.clone(),
            key_columns: self.pivot_keys.clone(),
            value_columns: self.value_columns.clone(),
            replacements: self.replacements.iter().map(|r| (r.from, r.to)).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterConfig {
    pub column: String,
    pub values: Vec<String>,
}

/// Exact value substitution, e.g. a sentinel `-777.7` → `0`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Replacement {
    pub from: f64,
    pub to: f64,
}

/// `|total − Σ components| < tolerance` ratio check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckConfig {
    pub source: String,
    pub total: String,
    pub components: Vec<String>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// A lower ratio is logged as a warning.
    #[serde(default = "default_min_ratio")]
    pub min_ratio: f64,
}

fn default_tolerance() -> f64 {
    0.001
}

fn default_min_ratio() -> f64 {
    0.95
}

/// Features derived on the joined, localized table.
///
/// Applied in field order: calendar, cyclical, aggregates, thresholds, lags,
/// shifts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeatureConfig {
    #[serde(default)]
    pub calendar: Option<CalendarConfig>,
    #[serde(default)]
    pub cyclical: Vec<CyclicalConfig>,
    #[serde(default)]
    pub aggregates: Vec<AggregateConfig>,
    #[serde(default)]
    pub thresholds: Vec<ThresholdConfig>,
    #[serde(default)]
    pub lags: Vec<LagGroupConfig>,
    #[serde(default)]
    pub shifts: Vec<ShiftConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarConfig {
    #[serde(default = "default_on_peak_start")]
    pub on_peak_start: u32,
    #[serde(default = "default_on_peak_end")]
    pub on_peak_end: u32,
}

fn default_on_peak_start() -> u32 {
    16
}

fn default_on_peak_end() -> u32 {
    21
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            on_peak_start: default_on_peak_start(),
            on_peak_end: default_on_peak_end(),
        }
    }
}

impl CalendarConfig {
    pub fn names(&self) -> CalendarNames {
        let mut names = CalendarNames::default();
        if let Some(on_peak) = names.on_peak.as_mut() {
            on_peak.1 = self.on_peak_start;
            on_peak.2 = self.on_peak_end;
        }
        names
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CyclicalConfig {
    pub column: String,
    pub period: f64,
}

/// `name = Σ add − Σ subtract`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateConfig {
    pub name: String,
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub subtract: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdConfig {
    pub column: String,
    pub threshold: f64,
    #[serde(default)]
    pub name: Option<String>,
}

impl ThresholdConfig {
    pub fn output_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}_ge_{}", self.column, self.threshold))
    }
}

/// Every column shifted by every offset, with default names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LagGroupConfig {
    pub columns: Vec<String>,
    pub offsets: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShiftConfig {
    pub column: String,
    pub offset_hours: i64,
    #[serde(default)]
    pub name: Option<String>,
}

impl ShiftConfig {
    pub fn output_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| gridfeat_core::features::shift_name(&self.column, self.offset_hours))
    }
}

impl PipelineConfig {
    /// Load and validate a pipeline from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a pipeline from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| invalid(format!("serialize config: {e}")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(invalid("at least one source is required"));
        }
        self.output.tz()?;
        if self.output.index_label.trim().is_empty() {
            return Err(invalid("output.index_label must not be empty"));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if !names.insert(source.name.as_str()) {
                return Err(invalid(format!("duplicate source name '{}'", source.name)));
            }
            if source.value_columns.is_empty() {
                return Err(invalid(format!(
                    "source '{}' has no value columns",
                    source.name
                )));
            }
            if let TimestampFormat::YearlessUtc { years, .. } = &source.timestamp_format {
                if years.is_empty() {
                    return Err(invalid(format!(
                        "source '{}' uses a yearless timestamp format with no years",
                        source.name
                    )));
                }
            }
            if let Some(rename) = &source.rename {
                if !source.pivot_keys.is_empty() || source.value_columns.len() != 1 {
                    return Err(invalid(format!(
                        "source '{}' can only rename a single value column with no pivot keys",
                        source.name
                    )));
                }
                if rename.trim().is_empty() {
                    return Err(invalid(format!("source '{}' has an empty rename", source.name)));
                }
            }
            if let Some(f) = source.filters.iter().find(|f| f.values.is_empty()) {
                return Err(invalid(format!(
                    "source '{}' filter on '{}' keeps no values",
                    source.name, f.column
                )));
            }
        }

        for check in &self.checks {
            if !names.contains(check.source.as_str()) {
                return Err(invalid(format!(
                    "check on '{}' references unknown source '{}'",
                    check.total, check.source
                )));
            }
            if check.tolerance.is_nan() || check.tolerance <= 0.0 {
                return Err(invalid(format!(
                    "check on '{}' needs a positive tolerance",
                    check.total
                )));
            }
        }

        let features = &self.features;
        if let Some(cal) = &features.calendar {
            if cal.on_peak_start > cal.on_peak_end || cal.on_peak_end > 23 {
                return Err(invalid(format!(
                    "on-peak window {}..={} is not within 0..=23",
                    cal.on_peak_start, cal.on_peak_end
                )));
            }
        }
        if let Some(c) = features.cyclical.iter().find(|c| c.period.is_nan() || c.period <= 0.0) {
            return Err(invalid(format!(
                "cyclical period for '{}' must be positive",
                c.column
            )));
        }
        if let Some(a) = features
            .aggregates
            .iter()
            .find(|a| a.add.is_empty() && a.subtract.is_empty())
        {
            return Err(invalid(format!("aggregate '{}' has no operands", a.name)));
        }
        if let Some(t) = features.thresholds.iter().find(|t| !t.threshold.is_finite()) {
            return Err(invalid(format!(
                "threshold on '{}' must be finite",
                t.column
            )));
        }
        let offsets = features
            .lags
            .iter()
            .flat_map(|g| g.offsets.iter().copied())
            .chain(features.shifts.iter().map(|s| s.offset_hours));
        for offset in offsets {
            if offset.unsigned_abs() > MAX_SHIFT_HOURS.unsigned_abs() {
                return Err(invalid(format!(
                    "shift offset {offset}h exceeds the {MAX_SHIFT_HOURS}h limit"
                )));
            }
        }
        Ok(())
    }

    /// The CAISO pipeline: real-time and day-ahead prices, system load,
    /// renewable forecasts and hourly weather normals, joined and enriched
    /// with price-forecasting features.
    ///
    /// Source directories are relative to the working directory.
    pub fn caiso_default() -> Self {
        let strings = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let solar = |label: &str| {
            ["NP15", "SP15", "ZP26"]
                .iter()
                .map(|hub| format!("{hub}_Solar_Renewable Forecast {label}"))
                .collect::<Vec<_>>()
        };
        let wind = |label: &str| {
            ["NP15", "SP15"]
                .iter()
                .map(|hub| format!("{hub}_Wind_Renewable Forecast {label}"))
                .collect::<Vec<_>>()
        };
        let aggregate = |name: &str, add: Vec<String>, subtract: Vec<String>| AggregateConfig {
            name: name.into(),
            add,
            subtract,
        };

        let weather_columns: Vec<String> = ["HLY-CLDH-NORMAL", "HLY-HTDH-NORMAL", "HLY-TEMP-NORMAL"]
            .iter()
            .flat_map(|v| {
                ["USW00023174", "USW00023188"]
                    .iter()
                    .map(move |s| format!("{v}_{s}"))
            })
            .collect();

        let mut shifts = Vec::new();
        for column in ["DA_LMP", "RT_LMP"] {
            for offset_hours in [12, 2] {
                shifts.push(ShiftConfig {
                    column: column.into(),
                    offset_hours,
                    name: None,
                });
            }
        }
        for column in [
            "hour", "friday", "weekend", "month", "sin_month", "cos_month", "sin_hour", "cos_hour",
        ] {
            shifts.push(ShiftConfig {
                column: column.into(),
                offset_hours: 2,
                name: Some(format!("target_{column}")),
            });
        }

        Self {
            output: OutputConfig {
                path: PathBuf::from("Cleaned_Data/LMP_and_feature_data.csv"),
                timezone: default_timezone(),
                index_label: "INTERVALSTARTTIME_GMT".into(),
            },
            sources: vec![
                SourceConfig {
                    name: "rt_lmp".into(),
                    dir: PathBuf::from("data/rt_lmp"),
                    columns: None,
                    timestamp_column: "INTERVALSTARTTIME_GMT".into(),
                    timestamp_format: TimestampFormat::Rfc3339,
                    filters: Vec::new(),
                    pivot_keys: strings(&["LMP_TYPE"]),
                    value_columns: strings(&["VALUE"]),
                    prefix: "RT_".into(),
                    resample: true,
                    replacements: Vec::new(),
                    rename: None,
                },
                SourceConfig {
                    name: "da_lmp".into(),
                    dir: PathBuf::from("data/da_lmp"),
                    columns: None,
                    timestamp_column: "INTERVALSTARTTIME_GMT".into(),
                    timestamp_format: TimestampFormat::Rfc3339,
                    filters: Vec::new(),
                    pivot_keys: strings(&["LMP_TYPE"]),
                    value_columns: strings(&["MW"]),
                    prefix: "DA_".into(),
                    resample: false,
                    replacements: Vec::new(),
                    rename: None,
                },
                SourceConfig {
                    name: "load".into(),
                    dir: PathBuf::from("data/load"),
                    columns: None,
                    timestamp_column: "INTERVALSTARTTIME_GMT".into(),
                    timestamp_format: TimestampFormat::Rfc3339,
                    filters: vec![FilterConfig {
                        column: "TAC_ZONE_NAME".into(),
                        values: strings(&["Caiso_Totals"]),
                    }],
                    pivot_keys: strings(&["SCHEDULE"]),
                    value_columns: strings(&["MW"]),
                    prefix: String::new(),
                    resample: true,
                    replacements: Vec::new(),
                    rename: None,
                },
                SourceConfig {
                    name: "renewables".into(),
                    dir: PathBuf::from("data/renewables"),
                    columns: None,
                    timestamp_column: "INTERVALSTARTTIME_GMT".into(),
                    timestamp_format: TimestampFormat::Rfc3339,
                    filters: vec![FilterConfig {
                        column: "LABEL".into(),
                        values: strings(&[
                            "Renewable Forecast Day Ahead",
                            "Renewable Forecast Actual Generation",
                        ]),
                    }],
                    pivot_keys: strings(&["TRADING_HUB", "RENEWABLE_TYPE", "LABEL"]),
                    value_columns: strings(&["MW"]),
                    prefix: String::new(),
                    resample: true,
                    replacements: Vec::new(),
                    rename: None,
                },
                SourceConfig {
                    name: "weather".into(),
                    dir: PathBuf::from("data/weather"),
                    columns: None,
                    timestamp_column: "DATE".into(),
                    timestamp_format: TimestampFormat::YearlessUtc {
                        pattern: "%m-%dT%H:%M:%S".into(),
                        years: vec![2020, 2021, 2022, 2023],
                    },
                    filters: vec![FilterConfig {
                        column: "STATION".into(),
                        values: strings(&["USW00023174", "USW00023188"]),
                    }],
                    pivot_keys: strings(&["STATION"]),
                    value_columns: strings(&[
                        "HLY-CLDH-NORMAL",
                        "HLY-HTDH-NORMAL",
                        "HLY-TEMP-NORMAL",
                    ]),
                    prefix: String::new(),
                    resample: false,
                    replacements: vec![Replacement {
                        from: -777.7,
                        to: 0.0,
                    }],
                    rename: None,
                },
            ],
            checks: vec![CheckConfig {
                source: "rt_lmp".into(),
                total: "RT_LMP".into(),
                components: strings(&["RT_MCC", "RT_MCE", "RT_MCL", "RT_MGHG"]),
                tolerance: default_tolerance(),
                min_ratio: default_min_ratio(),
            }],
            features: FeatureConfig {
                calendar: Some(CalendarConfig::default()),
                cyclical: vec![
                    CyclicalConfig {
                        column: "month".into(),
                        period: 12.0,
                    },
                    CyclicalConfig {
                        column: "hour".into(),
                        period: 24.0,
                    },
                ],
                aggregates: vec![
                    aggregate("Total_Solar_Actual", solar("Actual Generation"), vec![]),
                    aggregate("Total_Solar_Forecast", solar("Day Ahead"), vec![]),
                    aggregate("Total_Wind_Actual", wind("Actual Generation"), vec![]),
                    aggregate("Total_Wind_Forecast", wind("Day Ahead"), vec![]),
                    aggregate(
                        "Total_Wind_Solar_Actual",
                        strings(&["Total_Solar_Actual", "Total_Wind_Actual"]),
                        vec![],
                    ),
                    aggregate(
                        "Total_Wind_Solar_Forecast",
                        strings(&["Total_Solar_Forecast", "Total_Wind_Forecast"]),
                        vec![],
                    ),
                    aggregate(
                        "renew_forecast_error",
                        strings(&["Total_Wind_Solar_Actual"]),
                        strings(&["Total_Wind_Solar_Forecast"]),
                    ),
                    aggregate(
                        "solar_forecast_error",
                        strings(&["Total_Solar_Actual"]),
                        strings(&["Total_Solar_Forecast"]),
                    ),
                    aggregate(
                        "wind_forecast_error",
                        strings(&["Total_Wind_Actual"]),
                        strings(&["Total_Wind_Forecast"]),
                    ),
                    aggregate("DART", strings(&["DA_LMP"]), strings(&["RT_LMP"])),
                ],
                thresholds: [50.0, 75.0, 100.0, 150.0]
                    .iter()
                    .map(|&t| ThresholdConfig {
                        column: "RT_LMP".into(),
                        threshold: t,
                        name: Some(format!("RTLMP_spike_{t}_binary")),
                    })
                    .collect(),
                lags: vec![
                    LagGroupConfig {
                        columns: strings(&[
                            "RT_LMP",
                            "DA_LMP",
                            "renew_forecast_error",
                            "Export",
                            "Generation",
                            "Import",
                        ]),
                        offsets: vec![-2, -4, -12, -20, -22, -23],
                    },
                    LagGroupConfig {
                        columns: weather_columns,
                        offsets: vec![-2, -4, -12, -22, -23],
                    },
                ],
                shifts,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [output]
        path = "out/features.csv"

        [[sources]]
        name = "rt"
        dir = "data/rt"
        timestamp_column = "INTERVALSTARTTIME_GMT"
        pivot_keys = ["LMP_TYPE"]
        value_columns = ["VALUE"]
        prefix = "RT_"
        resample = true
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = PipelineConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(cfg.output.timezone, "America/Los_Angeles");
        assert_eq!(cfg.output.index_label, "timestamp");
        assert_eq!(cfg.sources[0].timestamp_format, TimestampFormat::Rfc3339);
        assert!(cfg.checks.is_empty());
        assert_eq!(cfg.features, FeatureConfig::default());
    }

    #[test]
    fn caiso_default_is_valid_and_roundtrips() {
        let cfg = PipelineConfig::caiso_default();
        cfg.validate().unwrap();
        let toml_str = cfg.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn shipped_caiso_file_matches_builtin() {
        let shipped = include_str!("../../configs/caiso.toml");
        let parsed = PipelineConfig::from_toml(shipped).unwrap();
        assert_eq!(parsed, PipelineConfig::caiso_default());
    }

    #[test]
    fn caiso_default_feature_names() {
        let cfg = PipelineConfig::caiso_default();
        let thresholds: Vec<String> = cfg
            .features
            .thresholds
            .iter()
            .map(ThresholdConfig::output_name)
            .collect();
        assert_eq!(thresholds[0], "RTLMP_spike_50_binary");
        let shifts: Vec<String> = cfg.features.shifts.iter().map(ShiftConfig::output_name).collect();
        assert!(shifts.contains(&"DA_LMP_in_12_hrs".to_string()));
        assert!(shifts.contains(&"target_sin_hour".to_string()));
    }

    #[test]
    fn yearless_format_parses_from_toml() {
        let toml_str = format!(
            "{MINIMAL}\ntimestamp_format = {{ kind = \"yearless_utc\", pattern = \"%m-%dT%H:%M:%S\", years = [2021] }}\n"
        );
        let cfg = PipelineConfig::from_toml(&toml_str).unwrap();
        assert!(matches!(
            cfg.sources[0].timestamp_format,
            TimestampFormat::YearlessUtc { ref years, .. } if years == &[2021]
        ));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let mut cfg = PipelineConfig::from_toml(MINIMAL).unwrap();
        cfg.output.timezone = "Mars/Olympus_Mons".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn duplicate_source_names_are_rejected() {
        let mut cfg = PipelineConfig::from_toml(MINIMAL).unwrap();
        cfg.sources.push(cfg.sources[0].clone());
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate source name 'rt'"));
    }

    #[test]
    fn check_must_reference_a_source() {
        let mut cfg = PipelineConfig::from_toml(MINIMAL).unwrap();
        cfg.checks.push(CheckConfig {
            source: "da".into(),
            total: "DA_LMP".into(),
            components: vec!["DA_MCE".into()],
            tolerance: 0.001,
            min_ratio: 0.9,
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn on_peak_window_must_fit_a_day() {
        let mut cfg = PipelineConfig::from_toml(MINIMAL).unwrap();
        cfg.features.calendar = Some(CalendarConfig {
            on_peak_start: 20,
            on_peak_end: 24,
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn oversized_shift_offsets_are_rejected() {
        let mut cfg = PipelineConfig::from_toml(MINIMAL).unwrap();
        cfg.features.shifts.push(ShiftConfig {
            column: "RT_LMP".into(),
            offset_hours: MAX_SHIFT_HOURS,
            name: None,
        });
        cfg.validate().unwrap();

        cfg.features.lags.push(LagGroupConfig {
            columns: vec!["RT_LMP".into()],
            offsets: vec![-2, i64::MIN],
        });
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds"));

        cfg.features.lags.clear();
        cfg.features.shifts[0].offset_hours = 3_000_000_000;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn keyless_source_can_rename_its_value() {
        let toml_str = MINIMAL
            .replace("pivot_keys = [\"LMP_TYPE\"]", "")
            .replace("resample = true", "resample = true\n        rename = \"renewables_rtd\"");
        let cfg = PipelineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(cfg.sources[0].rename.as_deref(), Some("renewables_rtd"));

        let mut keyed = cfg.clone();
        keyed.sources[0].pivot_keys = vec!["LMP_TYPE".into()];
        assert!(keyed.validate().is_err());

        let mut multi = cfg;
        multi.sources[0].value_columns.push("MW".into());
        assert!(multi.validate().is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = PipelineConfig::from_file(Path::new("/nonexistent/pipeline.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pipeline.toml"));
    }

    #[test]
    fn source_builds_long_spec() {
        let cfg = PipelineConfig::caiso_default();
        let weather = cfg.sources.iter().find(|s| s.name == "weather").unwrap();
        let spec = weather.long_spec();
        assert_eq!(spec.replacements, vec![(-777.7, 0.0)]);
        assert_eq!(spec.value_columns.len(), 3);
    }
}

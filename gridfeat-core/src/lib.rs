//! Gridfeat Core: time-series alignment and feature generation for hourly
//! grid market data.
//!
//! This crate holds every pure transform of the pipeline:
//! - Directory loading and long-format record extraction (`data`)
//! - Pivoting long records into wide tables (`reshape`)
//! - Hourly resampling (`resample`)
//! - Inner temporal join across sources (`align`)
//! - Lag/lead shifts and per-row derived features (`features`)
//! - Component-sum consistency ratios (`sanity`)
//!
//! Filesystem output, configuration and orchestration live in the runner.

pub mod align;
pub mod data;
pub mod error;
pub mod features;
pub mod resample;
pub mod reshape;
pub mod sanity;
pub mod table;

pub use align::{inner_join, namespace, NamedTable};
pub use error::{FeatureError, Result};
pub use reshape::{melt, pivot};
pub use resample::{floor_hour, resample_hourly};
pub use sanity::component_sum_ratio;
pub use table::{utc, Column, TimeIndex, TimeSeriesTable, Timestamp};

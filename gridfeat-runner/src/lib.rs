//! Gridfeat Runner: pipeline configuration, orchestration and export.
//!
//! This crate builds on `gridfeat-core` to provide:
//! - TOML pipeline configuration with a built-in CAISO pipeline
//! - Fixed-order stage orchestration with a single terminal write
//! - Deterministic CSV export with a BLAKE3 content hash

pub mod config;
pub mod export;
pub mod pipeline;

pub use config::{ConfigError, PipelineConfig};
pub use export::{write_table, ExportError, WrittenArtifact};
pub use pipeline::{apply_features, run_pipeline, PipelineError, RunSummary};

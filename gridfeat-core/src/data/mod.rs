//! Raw source loading

pub mod ingest;
pub mod timestamp;

pub use ingest::{load_dir, LongRecord, LongSpec, RecordSchema, RecordSet};
pub use timestamp::TimestampFormat;

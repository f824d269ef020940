#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch enrichment of coordinate records.
//!
//! Delimited input files are read in fixed-size chunks. Each record of a
//! chunk is resolved against every layer of a shared, read-only
//! [`LayerRegistry`](geo_reverse_spatial::LayerRegistry) and given a
//! geohash, in parallel on a `rayon` pool, then written to a
//! [`RecordSink`] in input order before the next chunk is read.
//!
//! Per-record problems (unparsable coordinates, malformed rows) skip the
//! record and are counted. Configuration, layer, input, and sink failures
//! abort the run.

pub mod accounting;
pub mod pipeline;
pub mod processor;
pub mod progress;
pub mod reader;
pub mod record;
pub mod sink;
pub mod summary;

use std::path::PathBuf;

use geo_reverse_catalog::ConfigLoadError;
use geo_reverse_spatial::{CoordinateError, LayerConfigError};

pub use accounting::FailureAccounting;
pub use pipeline::Pipeline;
pub use processor::{BatchOutput, BatchProcessor};
pub use record::{EnrichedRecord, InputRecord};
pub use sink::{MemorySink, NdjsonFileSink, RecordSink};
pub use summary::{FileSummary, RunStatus, RunSummary};

/// A single input record that cannot be enriched. The record is skipped;
/// the batch continues.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    /// A required coordinate column is absent.
    #[error("row {row}: missing column '{column}'")]
    MissingColumn {
        /// 1-based data row.
        row: u64,
        /// Column name.
        column: &'static str,
    },

    /// A coordinate value is not a number.
    #[error("row {row}: {column} value {value:?} is not a number")]
    NotANumber {
        /// 1-based data row.
        row: u64,
        /// Column name.
        column: &'static str,
        /// Raw value.
        value: String,
    },

    /// A coordinate is outside the valid range.
    #[error("row {row}: {source}")]
    OutOfRange {
        /// 1-based data row.
        row: u64,
        /// Range violation.
        source: CoordinateError,
    },

    /// The delimited row itself could not be parsed.
    #[error("row {row}: malformed record: {message}")]
    Malformed {
        /// 1-based data row.
        row: u64,
        /// Parser message.
        message: String,
    },
}

/// The output sink failed to persist a chunk.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Creating, writing, or flushing the output failed.
    #[error("Failed to write {path}: {source}")]
    Io {
        /// Output path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A record could not be serialized.
    #[error("Failed to serialize record for {path}: {source}")]
    Serialize {
        /// Output path.
        path: PathBuf,
        /// Underlying serialization error.
        source: serde_json::Error,
    },
}

/// The batch processor cannot be set up for the loaded layers.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// No loaded layer writes the accounting key column.
    #[error(
        "Key column '{column}' is not produced by any loaded layer (available: {})",
        .available.join(", ")
    )]
    KeyColumnNotProduced {
        /// Configured key column.
        column: String,
        /// Output columns the registry does produce.
        available: Vec<String>,
    },
}

/// Fatal errors that terminate a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Configuration or catalog loading failed.
    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    /// A layer could not be loaded.
    #[error(transparent)]
    Layer(#[from] LayerConfigError),

    /// The processor could not be set up.
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// An input file could not be opened or read.
    #[error("Failed to read input {path}: {source}")]
    Input {
        /// Input path.
        path: PathBuf,
        /// Underlying reader error.
        source: csv::Error,
    },

    /// The output sink failed.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The worker pool could not be created.
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl RunError {
    /// Status reported in the run summary for this failure.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        match self {
            Self::Config(_) => RunStatus::ConfigError,
            Self::Layer(_) => RunStatus::LayerError,
            Self::Batch(_) => RunStatus::BatchError,
            Self::Input { .. } => RunStatus::InputError,
            Self::Sink(_) => RunStatus::SinkError,
            Self::ThreadPool(_) => RunStatus::InternalError,
        }
    }
}

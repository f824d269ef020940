//! Run status and the end-of-run summary payload.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};
use strum_macros::{AsRefStr, Display, EnumIter};

use crate::RunError;
use crate::accounting::FailureAccounting;

/// Outcome of a run, with a numeric code for external collectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum RunStatus {
    /// Every file was processed.
    Success = 200,
    /// The run configuration or layer catalog could not be loaded.
    ConfigError = 401,
    /// A layer's geometry or alias map is invalid.
    LayerError = 402,
    /// An input file could not be opened or read.
    InputError = 404,
    /// An output file could not be written.
    SinkError = 415,
    /// The processor could not be set up for the loaded layers.
    BatchError = 422,
    /// The runtime itself failed (worker pool).
    InternalError = 500,
}

impl RunStatus {
    /// Numeric status code.
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Success => "Process completed successfully",
            Self::ConfigError => "Failed to load run configuration or layer catalog",
            Self::LayerError => "Failed to load layer geometry",
            Self::InputError => "Failed to read input data",
            Self::SinkError => "Failed to save output data",
            Self::BatchError => "Key column is not produced by any loaded layer",
            Self::InternalError => "Internal runtime failure",
        }
    }

    /// Whether this is [`RunStatus::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl Serialize for RunStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RunStatus", 3)?;
        state.serialize_field("code", &self.code())?;
        state.serialize_field("name", self.as_ref())?;
        state.serialize_field("description", self.description())?;
        state.end()
    }
}

/// Outcome of one input file.
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    /// 1-based position of the file in the run.
    pub file_number: usize,
    /// Input path.
    pub input: PathBuf,
    /// Output path, `None` when no record was emitted.
    pub output: Option<PathBuf>,
    /// Data rows of the written chunks, including skipped ones.
    pub records_read: u64,
    /// Counts for this file.
    pub accounting: FailureAccounting,
    /// Chunks flushed.
    pub chunks: u64,
    /// Wall-clock seconds spent on this file.
    pub runtime_secs: f64,
}

impl FileSummary {
    /// An empty summary for file `file_number`, read from `input`.
    #[must_use]
    pub fn new(file_number: usize, input: impl Into<PathBuf>) -> Self {
        Self {
            file_number,
            input: input.into(),
            output: None,
            records_read: 0,
            accounting: FailureAccounting::new(),
            chunks: 0,
            runtime_secs: 0.0,
        }
    }
}

/// Observability payload for a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Name of the program that ran.
    pub app_name: String,
    /// Version of the program that ran.
    pub app_version: String,
    /// Final status; [`RunStatus::Success`] until a fatal error.
    pub status: RunStatus,
    /// Fatal error message, when the run failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock seconds from [`RunSummary::begin`] to
    /// [`RunSummary::finish`].
    pub runtime_secs: f64,
    /// Files in processing order, including the one a fatal error
    /// interrupted.
    pub files: Vec<FileSummary>,
    /// Counts across every file.
    pub accounting: FailureAccounting,
    #[serde(skip)]
    started: Instant,
}

impl RunSummary {
    /// Starts the clock for a run.
    #[must_use]
    pub fn begin(app_name: impl Into<String>, app_version: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            app_version: app_version.into(),
            status: RunStatus::Success,
            error: None,
            started_at: Utc::now(),
            runtime_secs: 0.0,
            files: Vec::new(),
            accounting: FailureAccounting::new(),
            started: Instant::now(),
        }
    }

    /// Adds a finished file and merges its counts into the run totals.
    pub fn record_file(&mut self, file: FileSummary) {
        self.accounting.merge(&file.accounting);
        self.files.push(file);
    }

    /// Marks the run as failed by `error`.
    pub fn fail(&mut self, error: &RunError) {
        self.status = error.status();
        self.error = Some(error.to_string());
    }

    /// Stops the clock.
    pub fn finish(&mut self) {
        self.runtime_secs = self.started.elapsed().as_secs_f64();
    }

    /// Number of files processed.
    #[must_use]
    pub fn files_processed(&self) -> usize {
        self.files.len()
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal progress and logging for the `geo_reverse` binary.
//!
//! [`RunBars`] renders the two levels a batch run reports (files in the
//! run, records in the current file) as `indicatif` bars behind the batch
//! [`ProgressCallback`] trait. [`init_logger`] routes `log` output through
//! the same [`MultiProgress`] so log lines never tear a bar.

use std::sync::Arc;
use std::time::Duration;

use geo_reverse_batch::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// What a bar counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarKind {
    /// Input files of the run. Total known up front.
    Files,
    /// Records of the current file. Total unknown; rendered as a counter.
    Records,
}

impl BarKind {
    fn initial_style(self) -> ProgressStyle {
        match self {
            Self::Files => {
                Self::counted_style("{msg:>8} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}]")
            }
            Self::Records => ProgressStyle::with_template(
                "{spinner:.cyan} {msg} {human_pos} records ({per_sec})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        }
    }

    fn counted_style(template: &str) -> ProgressStyle {
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

/// An `indicatif` bar implementing [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    kind: BarKind,
}

impl IndicatifProgress {
    /// Adds a bar of `kind` to `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress, kind: BarKind, message: &str) -> Self {
        let bar = match kind {
            BarKind::Files => multi.add(ProgressBar::new(0)),
            BarKind::Records => {
                let bar = multi.add(ProgressBar::new_spinner());
                bar.enable_steady_tick(Duration::from_millis(120));
                bar
            }
        };
        bar.set_style(kind.initial_style());
        bar.set_message(message.to_string());

        Self { bar, kind }
    }

    /// What this bar counts.
    #[must_use]
    pub const fn kind(&self) -> BarKind {
        self.kind
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        if self.kind == BarKind::Records {
            // A known record count turns the counter into a bar with ETA.
            self.bar.set_style(BarKind::counted_style(
                "  {msg} {wide_bar:.cyan/dim} {human_pos}/{human_len} [{eta}]",
            ));
        }
    }

    fn set_position(&self, pos: u64) {
        self.bar.set_position(pos);
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// The files bar and records bar of one run.
pub struct RunBars {
    /// Advances once per input file.
    pub files: Arc<dyn ProgressCallback>,
    /// Counts rows of the file being processed.
    pub records: Arc<dyn ProgressCallback>,
}

impl RunBars {
    /// Adds both bars to `multi`, files above records.
    #[must_use]
    pub fn new(multi: &MultiProgress) -> Self {
        Self {
            files: Arc::new(IndicatifProgress::new(multi, BarKind::Files, "files")),
            records: Arc::new(IndicatifProgress::new(multi, BarKind::Records, "records")),
        }
    }
}

/// Installs a `pretty_env_logger` logger (filter from `RUST_LOG`, or
/// [`DEFAULT_LOG_FILTER`]) behind `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] every bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
    let logger = pretty_env_logger::formatted_timed_builder()
        .parse_filters(&filter)
        .build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}

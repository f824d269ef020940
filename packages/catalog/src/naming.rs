//! Output file naming.
//!
//! Each input file gets its own output named after its position in the
//! run, the run date, and a random nonce, e.g.
//! `year=2024/month=03/day=07/georeverse_results_001_2024-03-07-3F9A01BC.json`.

use std::path::PathBuf;

use chrono::NaiveDate;

/// Prefix of every output event name.
pub const EVENT_PREFIX: &str = "georeverse_results";

/// Extension of the newline-delimited JSON output.
pub const OUTPUT_EXTENSION: &str = "json";

/// Event name for the `file_number`-th input file (1-based).
#[must_use]
pub fn event_name(file_number: usize) -> String {
    format!("{EVENT_PREFIX}_{file_number:03}")
}

/// Eight uppercase hex characters from a random v4 UUID.
#[must_use]
pub fn nonce() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id.to_ascii_uppercase()
}

/// Relative output path for an event on `date`.
///
/// With `partition`, the file is nested under
/// `year=YYYY/month=MM/day=DD/`.
#[must_use]
pub fn output_path(event_name: &str, date: NaiveDate, partition: bool) -> PathBuf {
    let file_name = format!(
        "{event_name}_{}-{}.{OUTPUT_EXTENSION}",
        date.format("%Y-%m-%d"),
        nonce()
    );

    if partition {
        PathBuf::from(format!("year={}", date.format("%Y")))
            .join(format!("month={}", date.format("%m")))
            .join(format!("day={}", date.format("%d")))
            .join(file_name)
    } else {
        PathBuf::from(file_name)
    }
}

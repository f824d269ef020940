//! Resolved/failed/skipped record counters.
//!
//! Counts only ever grow. Partial counts from separate chunks, files, or
//! workers combine with [`FailureAccounting::merge`], which is commutative
//! and associative, so the merge order never changes the totals.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use geo_reverse_layer_models::SENTINEL;
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Running counts over the designated key column.
///
/// `resolved + failed` is the number of records enriched. Skipped records
/// (unparsable coordinates or rows) are tracked separately and never
/// touch the other two counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureAccounting {
    resolved: u64,
    failed: u64,
    skipped: u64,
}

impl FailureAccounting {
    /// Creates zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            resolved: 0,
            failed: 0,
            skipped: 0,
        }
    }

    /// Counts one enriched record by its key column value. The sentinel
    /// (or a missing value) counts as a failure.
    pub fn record_key(&mut self, value: Option<&str>) {
        match value {
            Some(v) if v != SENTINEL => self.resolved += 1,
            _ => self.failed += 1,
        }
    }

    /// Counts one skipped record.
    pub const fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Adds `other`'s counts to these.
    pub const fn merge(&mut self, other: &Self) {
        self.resolved += other.resolved;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }

    /// Records whose key column held a real value.
    #[must_use]
    pub const fn resolved(&self) -> u64 {
        self.resolved
    }

    /// Records whose key column held the sentinel.
    #[must_use]
    pub const fn failed(&self) -> u64 {
        self.failed
    }

    /// Records skipped before enrichment.
    #[must_use]
    pub const fn skipped(&self) -> u64 {
        self.skipped
    }

    /// `resolved + failed`.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.resolved + self.failed
    }
}

impl AddAssign for FailureAccounting {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}

impl Add for FailureAccounting {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self.merge(&rhs);
        self
    }
}

impl Sum for FailureAccounting {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::new(), Add::add)
    }
}

impl Serialize for FailureAccounting {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FailureAccounting", 4)?;
        state.serialize_field("resolved", &self.resolved)?;
        state.serialize_field("failed", &self.failed)?;
        state.serialize_field("skipped", &self.skipped)?;
        state.serialize_field("total", &self.total())?;
        state.end()
    }
}

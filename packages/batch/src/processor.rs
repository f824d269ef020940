//! Per-record enrichment.
//!
//! [`BatchProcessor::enrich`] is a pure function of one record and the
//! shared registry, so [`BatchProcessor::process`] can fan a chunk out over
//! the current `rayon` pool. The indexed parallel collect keeps results in
//! input order.

use std::sync::Arc;

use geo_reverse_spatial::{LayerRegistry, geohash};
use rayon::prelude::*;

use crate::accounting::FailureAccounting;
use crate::record::{EnrichedRecord, GEOHASH_COLUMN, InputRecord};
use crate::{BatchError, RecordError};

/// Result of processing one chunk.
#[derive(Debug, Default)]
pub struct BatchOutput {
    /// Enriched records in input order, skipped records removed.
    pub records: Vec<EnrichedRecord>,
    /// Counts for this chunk.
    pub accounting: FailureAccounting,
    /// Why each skipped record was skipped, in input order.
    pub errors: Vec<RecordError>,
}

/// Enriches records against every layer of a registry.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    registry: Arc<LayerRegistry>,
    key_column: String,
    precision: usize,
}

impl BatchProcessor {
    /// Creates a processor counting resolutions on `key_column`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::KeyColumnNotProduced`] if no loaded layer
    /// writes `key_column`.
    pub fn new(
        registry: Arc<LayerRegistry>,
        key_column: impl Into<String>,
        precision: usize,
    ) -> Result<Self, BatchError> {
        let key_column = key_column.into();

        if !registry.produces(&key_column) {
            return Err(BatchError::KeyColumnNotProduced {
                column: key_column,
                available: registry
                    .output_columns()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            });
        }

        Ok(Self {
            registry,
            key_column,
            precision,
        })
    }

    /// The accounting key column.
    #[must_use]
    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    /// Enriches one record: every layer's columns in load order (later
    /// layers overwrite earlier ones), then `geohash`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the record's coordinates cannot be used.
    pub fn enrich(&self, record: InputRecord) -> Result<EnrichedRecord, RecordError> {
        let point = record.point()?;
        let mut fields = record.fields;

        self.registry.resolve_into(point, &mut fields);
        fields.insert(GEOHASH_COLUMN, geohash::encode_point(point, self.precision));

        Ok(EnrichedRecord {
            row: record.row,
            fields,
        })
    }

    /// Enriches a chunk in parallel on the current `rayon` pool.
    #[must_use]
    pub fn process(&self, records: Vec<InputRecord>) -> BatchOutput {
        let results: Vec<Result<EnrichedRecord, RecordError>> = records
            .into_par_iter()
            .map(|record| self.enrich(record))
            .collect();

        let mut output = BatchOutput {
            records: Vec::with_capacity(results.len()),
            ..BatchOutput::default()
        };

        for result in results {
            match result {
                Ok(record) => {
                    output
                        .accounting
                        .record_key(record.get(&self.key_column));
                    output.records.push(record);
                }
                Err(e) => {
                    output.accounting.record_skip();
                    output.errors.push(e);
                }
            }
        }

        output
    }
}

//! Chunked, per-file enrichment runs.
//!
//! Files are processed one after another in listing order. Within a file,
//! records are read `chunk_size` at a time, enriched in parallel on a
//! dedicated `rayon` pool, and written to the file's sink before the next
//! chunk is read, so memory stays bounded by the chunk size.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use geo_reverse_catalog::{RunConfig, files, layers, naming};
use geo_reverse_spatial::LayerRegistry;

use crate::RunError;
use crate::accounting::FailureAccounting;
use crate::processor::BatchProcessor;
use crate::progress::ProgressCallback;
use crate::reader::RecordReader;
use crate::record::InputRecord;
use crate::sink::{NdjsonFileSink, RecordSink};
use crate::summary::{FileSummary, RunSummary};

/// Discovers the configured layers and loads them into a registry.
///
/// # Errors
///
/// Returns [`RunError::Config`] if the catalog cannot be read and
/// [`RunError::Layer`] if a layer's geometry or aliases are invalid.
pub fn load_registry(config: &RunConfig) -> Result<LayerRegistry, RunError> {
    let start = Instant::now();
    let configs = layers::discover_layers(&config.geojson_dir, config.layers.as_deref())?;
    let registry = LayerRegistry::build(&configs, None)?;

    for layer in registry.layers() {
        log::info!(
            "  {}: {} polygon(s) -> [{}]",
            layer.name(),
            layer.polygon_count(),
            layer.output_columns().collect::<Vec<_>>().join(", ")
        );
    }
    log::info!(
        "Loaded {} layer(s) in {:.2}s",
        registry.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(registry)
}

/// A configured run over the shared layer registry.
pub struct Pipeline {
    config: RunConfig,
    processor: BatchProcessor,
    pool: rayon::ThreadPool,
}

impl Pipeline {
    /// Creates a pipeline over an already-loaded registry.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Batch`] if no layer produces the key column and
    /// [`RunError::ThreadPool`] if the worker pool cannot start.
    pub fn new(config: RunConfig, registry: Arc<LayerRegistry>) -> Result<Self, RunError> {
        let processor =
            BatchProcessor::new(registry, config.key_column.as_str(), config.geohash_precision)?;

        let workers = config.worker_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("geo-reverse-{i}"))
            .build()?;

        log::debug!(
            "Pipeline: {workers} worker(s), chunk size {}, key column '{}'",
            config.chunk_size,
            config.key_column
        );

        Ok(Self {
            config,
            processor,
            pool,
        })
    }

    /// Loads the registry described by `config` and creates a pipeline.
    ///
    /// # Errors
    ///
    /// See [`load_registry`] and [`Pipeline::new`].
    pub fn load(config: RunConfig) -> Result<Self, RunError> {
        let registry = load_registry(&config)?;
        Self::new(config, Arc::new(registry))
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The record processor.
    #[must_use]
    pub const fn processor(&self) -> &BatchProcessor {
        &self.processor
    }

    /// Enriches every record of `file.input` into `sink`, one chunk at a
    /// time, counting into `file` as each chunk is written.
    ///
    /// On error `file` still holds the counts of every chunk the sink
    /// accepted, so callers can report output already emitted.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Input`] if the file cannot be read and
    /// [`RunError::Sink`] if a chunk cannot be written. Chunks already
    /// written stay written.
    pub fn process_file(
        &self,
        file: &mut FileSummary,
        sink: &mut dyn RecordSink,
        progress: &dyn ProgressCallback,
    ) -> Result<(), RunError> {
        let start = Instant::now();
        let result = self.process_chunks(file, sink, progress);

        file.output = sink.output().map(Path::to_path_buf);
        file.runtime_secs = start.elapsed().as_secs_f64();
        result
    }

    fn process_chunks(
        &self,
        file: &mut FileSummary,
        sink: &mut dyn RecordSink,
        progress: &dyn ProgressCallback,
    ) -> Result<(), RunError> {
        let input = file.input.clone();
        let input_error = |source| RunError::Input {
            path: input.clone(),
            source,
        };

        let mut reader =
            RecordReader::open(&input, self.config.delimiter_byte()).map_err(input_error)?;

        loop {
            let rows = reader
                .read_chunk(self.config.chunk_size)
                .map_err(input_error)?;
            if rows.is_empty() {
                break;
            }
            let row_count = rows.len() as u64;

            let mut chunk = FailureAccounting::new();
            let mut records: Vec<InputRecord> = Vec::with_capacity(rows.len());
            for row in rows {
                match row {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        log::debug!("Skipping record: {e}");
                        chunk.record_skip();
                    }
                }
            }

            let output = self.pool.install(|| self.processor.process(records));
            for e in &output.errors {
                log::debug!("Skipping record: {e}");
            }
            chunk.merge(&output.accounting);

            sink.write_chunk(&output.records)?;
            file.accounting.merge(&chunk);
            file.records_read += row_count;
            file.chunks += 1;

            progress.inc(row_count);
            log::info!(
                "  chunk {}: {} record(s) written ({} resolved, {} failed, {} skipped)",
                file.chunks,
                output.records.len(),
                chunk.resolved(),
                chunk.failed(),
                chunk.skipped()
            );
        }

        sink.finish()?;
        Ok(())
    }

    /// Processes every input file of the configured data directory into
    /// its own dated NDJSON file under the results directory, recording
    /// each into `summary`.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run_with`].
    pub fn run(
        &self,
        summary: &mut RunSummary,
        files_progress: &dyn ProgressCallback,
        records_progress: &dyn ProgressCallback,
    ) -> Result<(), RunError> {
        let date = Local::now().date_naive();

        self.run_with(summary, files_progress, records_progress, |file_number| {
            let relative = naming::output_path(
                &naming::event_name(file_number),
                date,
                self.config.partition_output,
            );
            NdjsonFileSink::new(self.config.results_dir.join(relative))
        })
    }

    /// Processes every input file of the configured data directory, file
    /// `n` (1-based) into the sink `sink_for(n)` returns.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`RunError`]. Files finished before it keep
    /// their output and stay recorded in `summary`, and so does the file
    /// it interrupted, with the counts of the chunks written before it.
    pub fn run_with<S, F>(
        &self,
        summary: &mut RunSummary,
        files_progress: &dyn ProgressCallback,
        records_progress: &dyn ProgressCallback,
        mut sink_for: F,
    ) -> Result<(), RunError>
    where
        S: RecordSink,
        F: FnMut(usize) -> S,
    {
        let inputs = files::list_input_files(
            &self.config.data_dir,
            self.config.input_extension.as_deref(),
        )?;
        let total = inputs.len();
        log::info!(
            "Found {total} input file(s) in {}",
            self.config.data_dir.display()
        );

        files_progress.set_total(total as u64);

        for (index, input) in inputs.iter().enumerate() {
            let file_number = index + 1;
            log::info!("[{file_number}/{total}] Processing {}", input.display());

            let mut sink = sink_for(file_number);
            let mut file = FileSummary::new(file_number, input.as_path());

            records_progress.set_position(0);
            records_progress.set_message(format!("[{file_number}/{total}] {}", input.display()));

            if let Err(e) = self.process_file(&mut file, &mut sink, records_progress) {
                log::warn!(
                    "[{file_number}/{total}] Aborted after {} chunk(s), {} record(s) written",
                    file.chunks,
                    file.accounting.total()
                );
                summary.record_file(file);
                return Err(e);
            }

            log::info!(
                "[{file_number}/{total}] {} record(s): {} resolved, {} failed, {} skipped in {:.2}s{}",
                file.records_read,
                file.accounting.resolved(),
                file.accounting.failed(),
                file.accounting.skipped(),
                file.runtime_secs,
                file.output
                    .as_ref()
                    .map_or_else(|| " (no output)".to_string(), |p| format!(" -> {}", p.display()))
            );

            summary.record_file(file);
            files_progress.inc(1);
        }

        files_progress.finish(format!("{total} file(s) processed"));
        records_progress.finish(format!(
            "{} record(s): {} resolved, {} failed",
            summary.accounting.total(),
            summary.accounting.resolved(),
            summary.accounting.failed()
        ));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use geo_reverse_layer_models::SENTINEL;

    use super::*;
    use crate::progress::NullProgress;
    use crate::sink::MemorySink;
    use crate::record::EnrichedRecord;
    use crate::summary::RunStatus;
    use crate::{BatchError, SinkError};

    struct TempTree(PathBuf);

    impl TempTree {
        fn new() -> Self {
            let root =
                std::env::temp_dir().join(format!("geo_reverse_pipeline_{}", uuid::Uuid::new_v4()));
            std::fs::create_dir_all(&root).unwrap();
            Self(root)
        }

        fn write(&self, relative: &str, contents: &str) -> PathBuf {
            let path = self.0.join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, contents).unwrap();
            path
        }

        fn layer(&self, group: &str, name: &str, min: f64, max: f64, code: &str, alias: &str) {
            self.write(
                &format!("geojson/{group}/{name}/metadata.toml"),
                &format!("[[properties]]\nsource = \"code\"\nalias = \"{alias}\"\n"),
            );
            self.write(
                &format!("geojson/{group}/{name}/data.geo.json"),
                &format!(
                    r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","properties":{{"code":"{code}"}},"geometry":{{"type":"Polygon","coordinates":[[[{min},{min}],[{max},{min}],[{max},{max}],[{min},{max}],[{min},{min}]]]}}}}]}}"#
                ),
            );
        }

        fn config(&self) -> RunConfig {
            let mut config = RunConfig::from_toml_str(
                "data_dir = \"data\"\nresults_dir = \"results\"\ngeojson_dir = \"geojson\"\nworkers = 2\n",
            )
            .unwrap();
            config.data_dir = self.0.join("data");
            config.results_dir = self.0.join("results");
            config.geojson_dir = self.0.join("geojson");
            config
        }
    }

    impl Drop for TempTree {
        fn drop(&mut self) {
            std::fs::remove_dir_all(&self.0).ok();
        }
    }

    fn colombia() -> TempTree {
        let tree = TempTree::new();
        tree.layer("a_world", "country", -10.0, 10.0, "CO", "country_code");
        tree.layer("b_local", "city", -1.0, 1.0, "11001", "cod_dane");
        tree
    }

    const INPUT: &str = "id|latitude|longitude\n\
                         1|0.5|0.5\n\
                         2|north|0.5\n\
                         3|5.0|5.0\n\
                         4|-0.5|-0.5\n\
                         5|0.1|0.2\n";

    #[test]
    fn run_writes_one_ndjson_file_per_input() {
        let tree = colombia();
        tree.write("data/b.csv", INPUT);
        tree.write("data/A.csv", "id|latitude|longitude\n9|0.0|0.0\n");

        let pipeline = Pipeline::load(tree.config()).unwrap();
        let mut summary = RunSummary::begin("geo_reverse", "test");
        pipeline
            .run(&mut summary, &NullProgress, &NullProgress)
            .unwrap();

        assert_eq!(summary.files_processed(), 2);
        assert!(summary.files[0].input.ends_with("A.csv"), "case-insensitive order");
        assert_eq!(summary.accounting.resolved(), 4);
        assert_eq!(summary.accounting.failed(), 1);
        assert_eq!(summary.accounting.skipped(), 1);
        assert_eq!(summary.status, RunStatus::Success);

        let second = &summary.files[1];
        let output = second.output.as_ref().unwrap();
        let file_name = output.file_name().unwrap().to_string_lossy();
        assert!(file_name.starts_with("georeverse_results_002_"), "{file_name}");
        assert!(output.to_string_lossy().contains("year="), "{}", output.display());

        let lines: Vec<serde_json::Value> = std::fs::read_to_string(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let ids: Vec<&str> = lines.iter().map(|v| v["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["1", "3", "4", "5"]);
        assert_eq!(lines[0]["cod_dane"], "11001");
        assert_eq!(lines[0]["country_code"], "CO");
        assert_eq!(lines[1]["cod_dane"], SENTINEL);
        assert_eq!(lines[1]["country_code"], "CO");
        assert_eq!(lines[3]["geohash"].as_str().map(str::len), Some(12));
    }

    #[test]
    fn process_file_flushes_in_chunks() {
        let tree = colombia();
        let input = tree.write("data/in.csv", INPUT);

        let mut config = tree.config();
        config.chunk_size = 2;
        let pipeline = Pipeline::load(config).unwrap();

        let mut sink = MemorySink::default();
        let mut file = FileSummary::new(1, input);
        pipeline
            .process_file(&mut file, &mut sink, &NullProgress)
            .unwrap();

        assert_eq!(file.chunks, 3);
        assert_eq!(file.records_read, 5);
        assert_eq!(file.accounting.total(), 4);
        assert_eq!(file.accounting.skipped(), 1);
        assert_eq!(sink.chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![1, 2, 1]);
        assert_eq!(sink.records().map(|r| r.row).collect::<Vec<_>>(), vec![1, 3, 4, 5]);
        assert!(sink.finished);
    }

    #[test]
    fn header_only_input_leaves_no_output() {
        let tree = colombia();
        tree.write("data/empty.csv", "id|latitude|longitude\n");

        let pipeline = Pipeline::load(tree.config()).unwrap();
        let mut summary = RunSummary::begin("geo_reverse", "test");
        pipeline
            .run(&mut summary, &NullProgress, &NullProgress)
            .unwrap();

        assert_eq!(summary.files_processed(), 1);
        assert!(summary.files[0].output.is_none());
        assert_eq!(summary.accounting.total(), 0);
        assert!(!tree.0.join("results").exists());
    }

    #[test]
    fn key_column_must_be_produced() {
        let tree = colombia();
        let mut config = tree.config();
        config.key_column = "cod_mpio".to_string();

        let err = Pipeline::load(config).err().unwrap();
        assert!(
            matches!(err, RunError::Batch(BatchError::KeyColumnNotProduced { .. })),
            "{err}"
        );
        assert_eq!(err.status(), RunStatus::BatchError);
    }

    #[test]
    fn include_list_limits_loaded_layers() {
        let tree = colombia();
        let mut config = tree.config();
        config.layers = Some(vec!["city".to_string()]);

        let registry = load_registry(&config).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.layer("country").is_none());
    }

    #[test]
    fn missing_input_is_an_input_error() {
        let tree = colombia();
        let pipeline = Pipeline::load(tree.config()).unwrap();

        let mut file = FileSummary::new(1, tree.0.join("nope.csv"));
        let err = pipeline
            .process_file(&mut file, &mut MemorySink::default(), &NullProgress)
            .unwrap_err();
        assert!(matches!(err, RunError::Input { .. }), "{err}");
        assert_eq!(file.chunks, 0);
    }

    #[test]
    fn record_errors_never_abort_the_file() {
        let tree = colombia();
        let input = tree.write(
            "data/bad.csv",
            "id|latitude|longitude\n1|95|0\n2|0.2\n3|0.3|0.3\n",
        );
        let pipeline = Pipeline::load(tree.config()).unwrap();

        let mut sink = MemorySink::default();
        let mut file = FileSummary::new(1, input);
        pipeline
            .process_file(&mut file, &mut sink, &NullProgress)
            .unwrap();

        assert_eq!(file.accounting.skipped(), 2);
        assert_eq!(file.accounting.resolved(), 1);
        assert_eq!(sink.records().count(), 1);
    }

    /// Accepts the first chunk, then fails like a full disk.
    #[derive(Default)]
    struct FailsAfterFirstChunk {
        accepted: usize,
    }

    impl RecordSink for FailsAfterFirstChunk {
        fn write_chunk(&mut self, records: &[EnrichedRecord]) -> Result<(), SinkError> {
            if self.accepted > 0 {
                return Err(SinkError::Io {
                    path: PathBuf::from("out.json"),
                    source: std::io::Error::other("no space left on device"),
                });
            }
            self.accepted += records.len();
            Ok(())
        }

        fn finish(&mut self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    #[test]
    fn sink_failure_keeps_counts_of_written_chunks() {
        let tree = colombia();
        tree.write(
            "data/in.csv",
            "id|latitude|longitude
1|0.5|0.5
2|5.0|5.0
3|-0.5|-0.5
4|0.2|0.3
",
        );

        let mut config = tree.config();
        config.chunk_size = 2;
        let pipeline = Pipeline::load(config).unwrap();

        let mut summary = RunSummary::begin("geo_reverse", "test");
        let err = pipeline
            .run_with(&mut summary, &NullProgress, &NullProgress, |_| {
                FailsAfterFirstChunk::default()
            })
            .unwrap_err();
        summary.fail(&err);

        assert!(matches!(err, RunError::Sink(_)), "{err}");
        assert_eq!(summary.status, RunStatus::SinkError);
        assert_eq!(summary.status.code(), 415);

        assert_eq!(summary.files_processed(), 1);
        let file = &summary.files[0];
        assert_eq!(file.chunks, 1);
        assert_eq!(file.records_read, 2);
        assert_eq!(file.accounting.resolved(), 1);
        assert_eq!(file.accounting.failed(), 1);
        assert_eq!(summary.accounting.total(), 2);
    }
}

//! Output sinks for enriched records.

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use crate::SinkError;
use crate::record::EnrichedRecord;

/// Destination for enriched records, written one chunk at a time in
/// input order.
pub trait RecordSink {
    /// Persists one chunk. Called once per chunk, in order.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the chunk cannot be persisted.
    fn write_chunk(&mut self, records: &[EnrichedRecord]) -> Result<(), SinkError>;

    /// Flushes anything still buffered. Called once after the last chunk.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the final flush fails.
    fn finish(&mut self) -> Result<(), SinkError>;

    /// Where written records ended up, once anything was written.
    fn output(&self) -> Option<&Path> {
        None
    }
}

/// Writes newline-delimited JSON, one object per record, to a single file.
///
/// The file (and its parent directories) is created on the first
/// non-empty chunk, so an input that emits nothing leaves no output
/// behind. Every chunk is flushed before `write_chunk` returns.
pub struct NdjsonFileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    records_written: u64,
}

impl NdjsonFileSink {
    /// Creates a sink for `path`. Nothing touches the filesystem yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            records_written: 0,
        }
    }

    /// Output path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written so far.
    #[must_use]
    pub const fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Whether the output file has been created.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        self.writer.is_some()
    }

    fn io_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn open(&mut self) -> Result<&mut BufWriter<File>, SinkError> {
        if self.writer.is_none() {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
            let file = File::create(&self.path).map_err(|e| self.io_error(e))?;
            log::debug!("Created output {}", self.path.display());
            self.writer = Some(BufWriter::new(file));
        }

        self.writer
            .as_mut()
            .ok_or_else(|| SinkError::Io {
                path: self.path.clone(),
                source: std::io::Error::other("output writer not initialised"),
            })
    }
}

impl RecordSink for NdjsonFileSink {
    fn write_chunk(&mut self, records: &[EnrichedRecord]) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }

        let path = self.path.clone();
        let writer = self.open()?;

        for record in records {
            serde_json::to_writer(&mut *writer, record).map_err(|source| {
                if source.is_io() {
                    SinkError::Io {
                        path: path.clone(),
                        source: source.into(),
                    }
                } else {
                    SinkError::Serialize {
                        path: path.clone(),
                        source,
                    }
                }
            })?;
            writer.write_all(b"\n").map_err(|source| SinkError::Io {
                path: path.clone(),
                source,
            })?;
        }

        writer.flush().map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;

        self.records_written += records.len() as u64;
        log::trace!(
            "Flushed {} records to {} ({} total)",
            records.len(),
            path.display(),
            self.records_written
        );

        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush().map_err(|source| SinkError::Io {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn output(&self) -> Option<&Path> {
        self.is_created().then_some(self.path.as_path())
    }
}

/// Collects records in memory, one `Vec` per chunk.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Chunks in the order they were written.
    pub chunks: Vec<Vec<EnrichedRecord>>,
    /// Whether [`RecordSink::finish`] has been called.
    pub finished: bool,
}

impl MemorySink {
    /// All records across chunks, in order.
    pub fn records(&self) -> impl Iterator<Item = &EnrichedRecord> {
        self.chunks.iter().flatten()
    }
}

impl RecordSink for MemorySink {
    fn write_chunk(&mut self, records: &[EnrichedRecord]) -> Result<(), SinkError> {
        if !records.is_empty() {
            self.chunks.push(records.to_vec());
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use geo_reverse_layer_models::ColumnMap;

    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("geo_reverse_sink_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn record(row: u64, code: &str) -> EnrichedRecord {
        let fields: ColumnMap = [("id", row.to_string()), ("cod_dane", code.to_string())]
            .into_iter()
            .collect();
        EnrichedRecord { row, fields }
    }

    #[test]
    fn empty_chunks_create_no_file() {
        let dir = temp_dir();
        let path = dir.join("nested").join("out.json");
        let mut sink = NdjsonFileSink::new(&path);

        sink.write_chunk(&[]).unwrap();
        sink.finish().unwrap();

        assert!(!sink.is_created());
        assert!(sink.output().is_none());
        assert!(!path.exists());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn appends_chunks_as_json_lines() {
        let dir = temp_dir();
        let path = dir.join("year=2024").join("out.json");
        let mut sink = NdjsonFileSink::new(&path);

        sink.write_chunk(&[record(1, "11001"), record(2, "-1")])
            .unwrap();
        sink.write_chunk(&[record(3, "05001")]).unwrap();
        sink.finish().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"id":"1","cod_dane":"11001"}"#,
                r#"{"id":"2","cod_dane":"-1"}"#,
                r#"{"id":"3","cod_dane":"05001"}"#,
            ]
        );
        assert_eq!(sink.records_written(), 3);
        assert_eq!(sink.output(), Some(path.as_path()));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn unwritable_path_is_a_sink_error() {
        let dir = temp_dir();
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut sink = NdjsonFileSink::new(blocker.join("out.json"));
        let err = sink.write_chunk(&[record(1, "11001")]).unwrap_err();

        assert!(matches!(err, SinkError::Io { .. }), "{err}");
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn memory_sink_keeps_chunk_boundaries() {
        let mut sink = MemorySink::default();
        sink.write_chunk(&[record(1, "a"), record(2, "b")]).unwrap();
        sink.write_chunk(&[]).unwrap();
        sink.write_chunk(&[record(3, "c")]).unwrap();
        sink.finish().unwrap();

        assert_eq!(sink.chunks.len(), 2);
        assert_eq!(sink.records().map(|r| r.row).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(sink.finished);
    }
}

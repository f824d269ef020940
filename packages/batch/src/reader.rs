//! Chunked reading of delimited input files.
//!
//! The first line of every file is the header. Each data row becomes an
//! [`InputRecord`] keyed by header name. A row the parser rejects (wrong
//! field count, invalid UTF-8) becomes a [`RecordError::Malformed`] in
//! place of the record so the caller can skip and count it; only I/O
//! failures abort the read.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use geo_reverse_layer_models::ColumnMap;

use crate::RecordError;
use crate::record::InputRecord;

/// One parsed row, or why it could not be parsed.
pub type RowResult = Result<InputRecord, RecordError>;

/// Streams [`InputRecord`]s out of a delimited source.
pub struct RecordReader<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    rows_read: u64,
    exhausted: bool,
}

impl RecordReader<File> {
    /// Opens `path` and reads its header line.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`csv::Error`] if the file cannot be opened
    /// or its header cannot be read.
    pub fn open(path: &Path, delimiter: u8) -> Result<Self, csv::Error> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_path(path)?;
        Self::with_reader(reader)
    }
}

impl<R: Read> RecordReader<R> {
    /// Wraps any byte source.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`csv::Error`] if the header cannot be read.
    pub fn from_reader(source: R, delimiter: u8) -> Result<Self, csv::Error> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(source);
        Self::with_reader(reader)
    }

    fn with_reader(mut reader: csv::Reader<R>) -> Result<Self, csv::Error> {
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        Ok(Self {
            reader,
            headers,
            rows_read: 0,
            exhausted: false,
        })
    }

    /// Header names in file order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows consumed so far, including malformed ones.
    #[must_use]
    pub const fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Reads up to `max` rows. An empty chunk means the input is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`csv::Error`] on an I/O failure.
    pub fn read_chunk(&mut self, max: usize) -> Result<Vec<RowResult>, csv::Error> {
        let mut chunk = Vec::with_capacity(max.min(4096));
        let mut record = StringRecord::new();

        while !self.exhausted && chunk.len() < max {
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    self.rows_read += 1;
                    chunk.push(Ok(self.to_input(&record)));
                }
                Ok(false) => self.exhausted = true,
                Err(e) if e.is_io_error() => return Err(e),
                Err(e) => {
                    self.rows_read += 1;
                    log::debug!("Skipping malformed row {}: {e}", self.rows_read);
                    chunk.push(Err(RecordError::Malformed {
                        row: self.rows_read,
                        message: e.to_string(),
                    }));
                }
            }
        }

        Ok(chunk)
    }

    fn to_input(&self, record: &StringRecord) -> InputRecord {
        let mut fields = ColumnMap::with_capacity(self.headers.len());
        for (header, value) in self.headers.iter().zip(record.iter()) {
            fields.insert(header.as_str(), value);
        }
        InputRecord::new(self.rows_read, fields)
    }
}

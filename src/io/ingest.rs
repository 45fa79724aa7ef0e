//! Streaming CSV record source.
//!
//! This module turns a headerless `label,feature_1,...` CSV stream into
//! batches of raw token records. It never holds more than one batch in
//! memory and does no numeric work: parsing and validation belong to the
//! accumulator.
//!
//! Every input line is one record. Blank lines are not skipped: they come
//! out as a record with a single empty token, so the accumulator rejects
//! them like any other malformed row.
//!
//! Design goals:
//! - **Streaming**: arbitrarily many rows, bounded memory
//! - **Line-accurate errors**: every record keeps its 1-based line number
//! - **Separation of concerns**: no regression logic here

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use csv::StringRecord;
use tracing::warn;

use crate::domain::BadRecordPolicy;
use crate::error::AppError;

/// One raw input row.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub line: u64,
    pub fields: StringRecord,
}

/// A row-level error encountered while reading or accumulating.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub source: String,
    pub line: u64,
    pub message: String,
}

/// A named, batched CSV reader.
pub struct RecordSource {
    name: String,
    reader: Box<dyn BufRead + Send>,
    line: Vec<u8>,
    rows_read: u64,
    row_errors: Vec<RowError>,
}

impl RecordSource {
    /// Open a file, or stdin for `-`.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        if path.as_os_str() == "-" {
            return Ok(Self::from_reader("<stdin>", std::io::stdin()));
        }
        let file = File::open(path).map_err(|e| {
            AppError::new(2, format!("Failed to open input '{}': {e}", path.display()))
        })?;
        Ok(Self::from_reader(path.display().to_string(), file))
    }

    pub fn from_reader<R>(name: impl Into<String>, reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            name: name.into(),
            reader: Box::new(BufReader::new(reader)),
            line: Vec::new(),
            rows_read: 0,
            row_errors: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rows seen so far, including rows that failed to decode.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Rows dropped by this reader under [`BadRecordPolicy::Skip`].
    pub fn row_errors(&self) -> &[RowError] {
        &self.row_errors
    }

    /// Read up to `batch_size` records. An empty batch means end of input.
    ///
    /// Undecodable rows (e.g. invalid UTF-8) follow `policy`; I/O failures
    /// always abort.
    pub fn next_batch(
        &mut self,
        batch_size: usize,
        policy: BadRecordPolicy,
    ) -> Result<Vec<RawRecord>, AppError> {
        let mut batch = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            self.line.clear();
            let read = self.reader.read_until(b'\n', &mut self.line).map_err(|e| {
                AppError::new(2, format!("Failed to read input '{}': {e}", self.name))
            })?;
            if read == 0 {
                break;
            }
            self.rows_read += 1;
            let line = self.rows_read;

            match decode_line(&self.line) {
                Ok(fields) => batch.push(RawRecord { line, fields }),
                Err(message) => match policy {
                    BadRecordPolicy::Abort => {
                        return Err(AppError::new(3, format!("{}:{line}: {message}", self.name)));
                    }
                    BadRecordPolicy::Skip => {
                        warn!(source = %self.name, line, error = %message, "skipping bad record");
                        self.row_errors.push(RowError {
                            source: self.name.clone(),
                            line,
                            message,
                        });
                    }
                },
            }
        }
        Ok(batch)
    }
}

/// Split one line (terminator included) into trimmed fields.
///
/// A blank line yields a single empty field.
fn decode_line(bytes: &[u8]) -> Result<StringRecord, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("CSV decode error: {e}"))?;
    let text = text.trim_end_matches(['\n', '\r']);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .buffer_capacity(text.len().max(1))
        .from_reader(text.as_bytes());
    let mut fields = StringRecord::new();
    match reader.read_record(&mut fields) {
        Ok(true) => Ok(fields),
        Ok(false) => Ok(StringRecord::from(vec![""])),
        Err(e) => Err(format!("CSV decode error: {e}")),
    }
}

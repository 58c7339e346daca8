//! Loads the current log content and returns the data rows after the header.

use encoding_rs::WINDOWS_1252;
use log::trace;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

use super::{HEADER_MARKER, LogRow};

#[derive(Debug, Error)]
pub enum ReadError {
    /// The monitor has not created the log yet, or it moved.
    #[error("log file not found")]
    Missing,
    /// Metadata preamble only so far; the header row hasn't been written.
    #[error("no header row containing {HEADER_MARKER:?}")]
    HeaderMissing,
    #[error("log read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("log not parseable as csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Reads the whole file and returns every row after the header, oldest first.
///
/// The monitor writes Windows-1252, not UTF-8 (degree signs in the header,
/// mostly), so the bytes are decoded before parsing. The header is the first
/// record with a field that trims to exactly the marker; everything before
/// and including it is preamble.
pub fn load_rows(path: &Path) -> Result<Vec<LogRow>, ReadError> {
    let bytes = match fs::read(path) {
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(ReadError::Missing),
        other => other?,
    };
    let (text, _, _) = WINDOWS_1252.decode(&bytes);

    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut seen_header = false;
    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record?;
        if seen_header {
            rows.push(record);
        } else if record.iter().any(|field| field.trim() == HEADER_MARKER) {
            seen_header = true;
        }
    }
    if !seen_header {
        return Err(ReadError::HeaderMissing);
    }
    trace!(target: "Reader", "{} data rows after header", rows.len());
    Ok(rows)
}

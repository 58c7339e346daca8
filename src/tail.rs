//! Tailing of the hardware monitor's CSV log.
//!
//! The monitor owns the file and only ever appends to it; we re-read it on
//! every poll and take the freshest row that survives the filters. Trimming
//! rewrites the same file on a much slower cadence with no locking, which is
//! survivable because the rewrite goes backup-then-replace.

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

pub mod extract;
pub mod reader;
pub mod trim;

pub use extract::{ExtractError, extract};
pub use reader::{ReadError, load_rows};
pub use trim::{TrimError, TrimOutcome};

use crate::config::Columns;
use std::path::Path;

/// Marks the header row that separates the metadata preamble from data rows.
pub const HEADER_MARKER: &str = "Framerate";

/// Timestamp layout the monitor writes: `DD-MM-YYYY HH:MM:SS`, local time,
/// no sub-seconds.
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// One data row, fields in file order. Field counts vary across rows; short
/// rows are filtered later, not rejected at parse time.
pub type LogRow = csv::StringRecord;

/// A single reading destined for the display. Built fresh each poll cycle
/// and dropped once sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub taken_at: NaiveDateTime,
    pub fps: i64,
    pub cpu_temp: i64,
    pub gpu_temp: i64,
    pub ram_mb: i64,
}

impl Sample {
    /// The line shape the firmware parses: four comma-separated integers.
    pub fn encode(&self) -> String {
        format!(
            "{},{},{},{}",
            self.fps, self.cpu_temp, self.gpu_temp, self.ram_mb
        )
    }
}

#[derive(Debug, Error)]
pub enum TailError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Load the log and pull the freshest usable sample out of it.
pub fn latest_sample(
    path: &Path,
    columns: &Columns,
    stale_after: Duration,
    now: NaiveDateTime,
) -> Result<Sample, TailError> {
    let rows = load_rows(path)?;
    Ok(extract(&rows, now, columns, stale_after)?)
}

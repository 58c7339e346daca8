//! Picks the freshest usable sample out of the data rows.

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

use super::{LogRow, Sample, TIMESTAMP_FORMAT};
use crate::config::Columns;

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    /// Every row was too short, placeholder-only, or numerically unreadable.
    #[error("no usable data rows")]
    NoRows,
    /// The newest populated row's timestamp didn't parse.
    #[error("timestamp not readable: {0:?}")]
    BadTimestamp(String),
    /// The newest populated row is older than the staleness window.
    #[error("newest sample is {age_secs}s old")]
    Stale { age_secs: i64 },
}

/// Scan rows newest-first and return the first one that passes every filter.
///
/// Skipping moves on to an older row; a bad or stale timestamp instead ends
/// the scan, since any row further back is older still. That asymmetry is
/// what separates "monitor paused mid-write" from "no live source at all".
pub fn extract(
    rows: &[LogRow],
    now: NaiveDateTime,
    columns: &Columns,
    stale_after: Duration,
) -> Result<Sample, ExtractError> {
    for row in rows.iter().rev() {
        if row.len() <= columns.max_index() {
            continue;
        }
        let fps_raw = row[columns.fps].trim();
        if fps_raw.is_empty() || fps_raw.eq_ignore_ascii_case("N/A") {
            // placeholder rows land before the first real reading
            continue;
        }

        let ts_raw = row[columns.timestamp].trim();
        let taken_at = NaiveDateTime::parse_from_str(ts_raw, TIMESTAMP_FORMAT)
            .map_err(|_| ExtractError::BadTimestamp(ts_raw.to_string()))?;
        let age = now - taken_at;
        if age > stale_after {
            return Err(ExtractError::Stale {
                age_secs: age.num_seconds(),
            });
        }

        if let Some(sample) = read_metrics(row, columns, taken_at) {
            return Ok(sample);
        }
    }
    Err(ExtractError::NoRows)
}

/// All four metrics must parse, or the row is passed over entirely.
fn read_metrics(row: &LogRow, columns: &Columns, taken_at: NaiveDateTime) -> Option<Sample> {
    Some(Sample {
        taken_at,
        fps: int_field(row, columns.fps)?,
        cpu_temp: int_field(row, columns.cpu_temp)?,
        gpu_temp: int_field(row, columns.gpu_temp)?,
        ram_mb: int_field(row, columns.ram_mb)?,
    })
}

fn int_field(row: &LogRow, index: usize) -> Option<i64> {
    // the monitor logs floats; the display wants integers, floor toward zero
    row[index].trim().parse::<f64>().ok().map(|v| v as i64)
}

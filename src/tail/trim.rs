//! Keeps the monitor's log from growing without bound.
//!
//! Works on raw bytes: a file that is already within bounds must come out of
//! here byte-for-byte untouched, and a rewrite must not re-encode what the
//! monitor wrote.

use log::{info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::HEADER_MARKER;

#[derive(Debug, Error)]
pub enum TrimError {
    #[error("trim io failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, PartialEq)]
pub enum TrimOutcome {
    /// File absent, marker line absent, or already within bounds.
    Untouched,
    Trimmed { dropped: usize },
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

/// Rewrite the log as preamble + header + the last `keep_rows` data lines.
///
/// The full original goes to a `.bak` sibling first, so an interrupted
/// rewrite always leaves one complete copy on disk; the backup is removed
/// once the rewrite lands. The external writer keeps appending with no
/// coordination, so this is best-effort, not transactional.
pub fn trim(path: &Path, keep_rows: usize) -> Result<TrimOutcome, TrimError> {
    let bytes = match fs::read(path) {
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(TrimOutcome::Untouched),
        other => other?,
    };

    let lines: Vec<&[u8]> = bytes.split_inclusive(|&b| b == b'\n').collect();
    let Some(header_index) = lines.iter().position(|line| contains_marker(line)) else {
        return Ok(TrimOutcome::Untouched);
    };
    let data = &lines[header_index + 1..];
    if data.len() <= keep_rows {
        return Ok(TrimOutcome::Untouched);
    }

    let backup = backup_path(path);
    fs::write(&backup, &bytes)?;

    let mut kept = Vec::with_capacity(bytes.len());
    for line in &lines[..=header_index] {
        kept.extend_from_slice(line);
    }
    for line in &data[data.len() - keep_rows..] {
        kept.extend_from_slice(line);
    }
    fs::write(path, &kept)?;
    fs::remove_file(&backup)?;

    let dropped = data.len() - keep_rows;
    info!(target: "Trim", "Dropped {} rows, kept last {}", dropped, keep_rows);
    Ok(TrimOutcome::Trimmed { dropped })
}

/// Startup pass: a leftover `.bak` means a previous rewrite was interrupted.
///
/// If the log itself is gone the backup is the only complete copy, so it
/// moves back into place. If the log survived, the monitor has been
/// appending to it ever since and the backup is the stale one.
pub fn recover(path: &Path) -> Result<(), TrimError> {
    let backup = backup_path(path);
    if !backup.exists() {
        return Ok(());
    }
    if path.exists() {
        warn!(target: "Trim", "Removing stale backup {:?}", backup);
        fs::remove_file(&backup)?;
    } else {
        warn!(target: "Trim", "Restoring {:?} from interrupted trim", path);
        fs::rename(&backup, path)?;
    }
    Ok(())
}

// Substring match, unlike the reader's field match: the rewrite must keep
// whatever line the monitor called a header, column structure or not.
fn contains_marker(line: &[u8]) -> bool {
    let marker = HEADER_MARKER.as_bytes();
    line.windows(marker.len()).any(|window| window == marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("statlink-trim-{}-{}", std::process::id(), name));
        path
    }

    fn log_with_rows(count: usize) -> Vec<u8> {
        let mut bytes = b"00, Hardware monitoring log\n02, Time, Framerate\n".to_vec();
        for i in 0..count {
            bytes.extend_from_slice(format!("80, 10-06-2024 12:00:{:02}, {}\n", i % 60, i).as_bytes());
        }
        bytes
    }

    fn data_lines(bytes: &[u8]) -> Vec<&[u8]> {
        let lines: Vec<&[u8]> = bytes.split_inclusive(|&b| b == b'\n').collect();
        let header = lines.iter().position(|l| contains_marker(l)).unwrap();
        lines[header + 1..].to_vec()
    }

    #[test]
    fn oversize_log_keeps_header_and_newest_suffix() {
        let path = scratch("oversize");
        let original = log_with_rows(1500);
        fs::write(&path, &original).unwrap();

        let outcome = trim(&path, 1000).unwrap();
        assert_eq!(outcome, TrimOutcome::Trimmed { dropped: 500 });

        let rewritten = fs::read(&path).unwrap();
        assert!(rewritten.starts_with(b"00, Hardware monitoring log\n02, Time, Framerate\n"));
        let kept = data_lines(&rewritten);
        let expected = data_lines(&original);
        assert_eq!(kept.len(), 1000);
        assert_eq!(kept, expected[500..].to_vec());
        assert!(!backup_path(&path).exists());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn undersize_log_is_left_byte_for_byte_alone() {
        let path = scratch("undersize");
        let original = log_with_rows(500);
        fs::write(&path, &original).unwrap();

        assert_eq!(trim(&path, 1000).unwrap(), TrimOutcome::Untouched);
        assert_eq!(fs::read(&path).unwrap(), original);
        assert!(!backup_path(&path).exists());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn exactly_at_the_limit_counts_as_within_bounds() {
        let path = scratch("at-limit");
        let original = log_with_rows(1000);
        fs::write(&path, &original).unwrap();

        assert_eq!(trim(&path, 1000).unwrap(), TrimOutcome::Untouched);
        assert_eq!(fs::read(&path).unwrap(), original);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn absent_file_and_absent_marker_are_no_ops() {
        assert_eq!(
            trim(&scratch("nonexistent"), 10).unwrap(),
            TrimOutcome::Untouched
        );

        let path = scratch("no-marker");
        fs::write(&path, b"just\nsome\nlines\n").unwrap();
        assert_eq!(trim(&path, 1).unwrap(), TrimOutcome::Untouched);
        assert_eq!(fs::read(&path).unwrap(), b"just\nsome\nlines\n");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn recover_restores_the_backup_when_the_log_is_gone() {
        let path = scratch("recover-restore");
        let backup = backup_path(&path);
        fs::write(&backup, b"saved content\n").unwrap();

        recover(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"saved content\n");
        assert!(!backup.exists());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn recover_prefers_the_live_log_over_a_stale_backup() {
        let path = scratch("recover-stale");
        let backup = backup_path(&path);
        fs::write(&path, b"live, still being appended\n").unwrap();
        fs::write(&backup, b"old snapshot\n").unwrap();

        recover(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"live, still being appended\n");
        assert!(!backup.exists());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn recover_without_a_backup_does_nothing() {
        let path = scratch("recover-clean");
        fs::write(&path, b"live\n").unwrap();
        recover(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"live\n");
        fs::remove_file(&path).unwrap();
    }
}

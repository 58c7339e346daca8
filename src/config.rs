//! Startup configuration for the bridge.
//!
//! Every field has a default matching the setup the bridge ships tuned for,
//! so running without a config file is the normal case.

use color_eyre::Result;
use config;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FILE: &str = "statlink.toml";

/// Zero-based field indices into one data row of the monitor's CSV.
///
/// The defaults match the column arrangement of the MSI Afterburner log the
/// bridge was built against; other arrangements are a config edit away.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Columns {
    pub timestamp: usize,
    pub fps: usize,
    pub cpu_temp: usize,
    pub gpu_temp: usize,
    pub ram_mb: usize,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            timestamp: 1,
            fps: 91,
            cpu_temp: 10,
            gpu_temp: 2,
            ram_mb: 34,
        }
    }
}

impl Columns {
    /// The widest index a row must cover to be usable at all.
    pub fn max_index(&self) -> usize {
        self.fps
            .max(self.timestamp)
            .max(self.cpu_temp)
            .max(self.gpu_temp)
            .max(self.ram_mb)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Serial {
    pub device: String,
    pub baud: u32,
    pub retry_secs: u64,
}

impl Default for Serial {
    fn default() -> Self {
        Self {
            device: "COM3".to_string(),
            baud: 9600,
            retry_secs: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub log_file: PathBuf,
    pub columns: Columns,
    pub serial: Serial,
    pub stale_after_secs: i64,
    pub poll_interval_ms: u64,
    pub trim_interval_secs: u64,
    pub keep_rows: usize,
    pub idle_payload: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("HardwareMonitoring.csv"),
            columns: Columns::default(),
            serial: Serial::default(),
            stale_after_secs: 10,
            poll_interval_ms: 500,
            trim_interval_secs: 600,
            keep_rows: 1000,
            idle_payload: "0,0,0,0".to_string(),
        }
    }
}

impl LinkConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn trim_interval(&self) -> Duration {
        Duration::from_secs(self.trim_interval_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.serial.retry_secs)
    }

    /// Load the file (if present) with `STATLINK_` environment overrides
    /// layered on top. An absent file just means defaults.
    pub fn load(file_path: PathBuf) -> Result<LinkConfig> {
        let raw = config::Config::builder()
            .add_source(config::File::from(file_path).required(false))
            .add_source(config::Environment::with_prefix("STATLINK").separator("__"))
            .build()?;
        Ok(raw.try_deserialize()?)
    }
}

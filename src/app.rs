use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use color_eyre::eyre::Result;
use log::*;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;

use crate::{
    config::LinkConfig,
    link::DisplayLink,
    tail::{self, ExtractError, ReadError, Sample, TailError, trim},
};

/// What the display is currently showing. Only decides what gets logged on
/// a flip; the send itself happens either way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activity {
    Idle,
    Streaming,
}

pub struct App {
    config: LinkConfig,
    link: DisplayLink,
    activity: Activity,
}

impl App {
    pub fn new(config: LinkConfig) -> Self {
        let link = DisplayLink::serial(&config.serial);
        Self::with_link(config, link)
    }

    pub fn with_link(config: LinkConfig, link: DisplayLink) -> Self {
        Self {
            config,
            link,
            activity: Activity::Idle,
        }
    }

    /// Run the poll loop until the token cancels.
    ///
    /// Each cycle does its work and then sleeps the fixed poll interval, so
    /// the effective period is work time plus sleep time; there is no drift
    /// correction, and none is needed for a display refresh.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        tokio::select! {
            _ = self.link.connect() => {}
            _ = cancel.cancelled() => return Ok(()),
        }

        let trimmer = tokio::spawn(trim_task(
            self.config.log_file.clone(),
            self.config.keep_rows,
            self.config.trim_interval(),
            cancel.child_token(),
        ));

        while !cancel.is_cancelled() {
            tokio::select! {
                _ = self.cycle() => {}
                _ = cancel.cancelled() => break,
            }
            tokio::select! {
                _ = sleep(self.config.poll_interval()) => {}
                _ = cancel.cancelled() => break,
            }
        }

        trimmer.await?;
        Ok(())
    }

    /// One poll: read, extract, send. Every failure is absorbed; the worst
    /// outcome of a cycle is an idle payload and a log line.
    async fn cycle(&mut self) {
        let outcome = tail::latest_sample(
            &self.config.log_file,
            &self.config.columns,
            chrono::Duration::seconds(self.config.stale_after_secs),
            Local::now().naive_local(),
        );

        let payload = match &outcome {
            Ok(sample) if sample.fps != 0 => {
                self.note_activity(Activity::Streaming, Some(sample));
                sample.encode()
            }
            _ => {
                if let Err(err) = &outcome {
                    log_tail_error(err);
                }
                self.note_activity(Activity::Idle, None);
                self.config.idle_payload.clone()
            }
        };

        if let Err(err) = self.link.send_line(&payload) {
            warn!(target: "App", "Dropped payload: {}", err);
            self.link.connect().await;
        }
    }

    fn note_activity(&mut self, next: Activity, sample: Option<&Sample>) {
        if next == self.activity {
            return;
        }
        match (next, sample) {
            (Activity::Streaming, Some(s)) => {
                info!(target: "App", "Live data, streaming to display (fps {})", s.fps)
            }
            _ => info!(target: "App", "No live data, display goes idle"),
        }
        self.activity = next;
    }
}

/// Per-kind handling from the poll loop's point of view: an absent file or
/// quiet monitor is routine, a read that failed outright is worth a warning.
fn log_tail_error(err: &TailError) {
    match err {
        TailError::Read(ReadError::Missing) => debug!(target: "App", "Log file not there yet"),
        TailError::Read(ReadError::HeaderMissing) => {
            debug!(target: "App", "Log has no header row yet")
        }
        TailError::Read(inner) => warn!(target: "App", "Log read failed: {}", inner),
        TailError::Extract(ExtractError::NoRows) => {
            debug!(target: "App", "No usable rows in the log")
        }
        TailError::Extract(inner) => debug!(target: "App", "{}", inner),
    }
}

/// Background truncation, fully independent of the poll cadence. Recovers
/// any backup a crashed rewrite left behind, then trims on a fixed tokio
/// interval; the first tick fires immediately, so an oversize log is cut
/// back at startup rather than ten minutes in.
async fn trim_task(
    log_file: PathBuf,
    keep_rows: usize,
    every: Duration,
    cancel: CancellationToken,
) {
    if let Err(err) = trim::recover(&log_file) {
        warn!(target: "Trim", "Backup recovery failed: {}", err);
    }

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = trim::trim(&log_file, keep_rows) {
                    warn!(target: "Trim", "Trim failed: {}", err);
                }
            }
            _ = cancel.cancelled() => {
                debug!(target: "Trim", "Trim task shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample(fps: i64) -> Sample {
        Sample {
            taken_at: NaiveDate::from_ymd_opt(2024, 6, 10)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            fps,
            cpu_temp: 54,
            gpu_temp: 61,
            ram_mb: 8123,
        }
    }

    fn app() -> App {
        App::new(LinkConfig::default())
    }

    #[test]
    fn activity_flips_only_on_transitions() {
        let mut app = app();
        assert_eq!(app.activity, Activity::Idle);
        app.note_activity(Activity::Streaming, Some(&sample(60)));
        assert_eq!(app.activity, Activity::Streaming);
        app.note_activity(Activity::Streaming, Some(&sample(61)));
        assert_eq!(app.activity, Activity::Streaming);
        app.note_activity(Activity::Idle, None);
        assert_eq!(app.activity, Activity::Idle);
    }
}

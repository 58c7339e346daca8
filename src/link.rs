//! Serial connection to the display board.

use log::{info, warn};
use std::io::Write;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("display not connected")]
    NotConnected,
    #[error("serial open failed: {0}")]
    Open(#[from] serialport::Error),
    #[error("serial write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Hands out a connected, writable port. The serial device lives behind this
/// seam so the reconnect logic can be exercised without hardware.
pub trait PortOpener: Send {
    fn open(&self) -> Result<Box<dyn Write + Send>, LinkError>;
}

pub struct SerialOpener {
    device: String,
    baud: u32,
}

impl PortOpener for SerialOpener {
    fn open(&self) -> Result<Box<dyn Write + Send>, LinkError> {
        let port = serialport::new(self.device.as_str(), self.baud).open()?;
        Ok(Box::new(port))
    }
}

/// Owned connection state for the display.
///
/// Disconnected -> Connected on a successful open; any write failure drops
/// straight back to Disconnected and the caller reconnects before the next
/// send. Nothing is buffered: a payload that fails to go out is gone.
pub struct DisplayLink {
    opener: Box<dyn PortOpener>,
    port: Option<Box<dyn Write + Send>>,
    retry: Duration,
}

impl DisplayLink {
    pub fn new(opener: Box<dyn PortOpener>, retry: Duration) -> Self {
        Self {
            opener,
            port: None,
            retry,
        }
    }

    pub fn serial(serial: &crate::config::Serial) -> Self {
        Self::new(
            Box::new(SerialOpener {
                device: serial.device.clone(),
                baud: serial.baud,
            }),
            Duration::from_secs(serial.retry_secs),
        )
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    /// Retries on a fixed interval until the device shows up. Never gives
    /// up; the board can stay unplugged for hours.
    pub async fn connect(&mut self) {
        loop {
            match self.opener.open() {
                Ok(port) => {
                    info!(target: "Link", "Display connected");
                    self.port = Some(port);
                    return;
                }
                Err(err) => {
                    warn!(target: "Link", "Waiting for display: {}", err);
                    tokio::time::sleep(self.retry).await;
                }
            }
        }
    }

    /// One newline-terminated payload.
    pub fn send_line(&mut self, payload: &str) -> Result<(), LinkError> {
        let Some(port) = self.port.as_mut() else {
            return Err(LinkError::NotConnected);
        };
        let sent = writeln!(port, "{}", payload).and_then(|_| port.flush());
        if let Err(err) = sent {
            self.port = None;
            return Err(LinkError::Write(err));
        }
        Ok(())
    }
}

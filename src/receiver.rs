//! # Receiver Loop
//!
//! Runs on the base station: reads the receiving modem's diagnostic lines,
//! timestamps and parses each one, and records it in both sinks. A line
//! that does not parse is still recorded, with empty decoded fields.

use std::future::Future;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::io::AsyncRead;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::protocol::{parse_line, ReceivedSample};
use crate::serial::LineReader;
use crate::sink::PersistenceSink;

/// Base-station loop context
pub struct Receiver<R> {
    radio: LineReader<R>,
    sink: PersistenceSink,
    antenna: String,
    read_timeout: Duration,
    received: u64,
}

impl<R: AsyncRead + Unpin> Receiver<R> {
    /// Create a receiver over an opened modem stream and opened sinks
    pub fn new(radio: R, sink: PersistenceSink, antenna: impl Into<String>, read_timeout: Duration) -> Self {
        Self {
            radio: LineReader::new(radio),
            sink,
            antenna: antenna.into(),
            read_timeout,
            received: 0,
        }
    }

    /// Parse and record one diagnostic line captured at `timestamp`
    pub async fn ingest(&mut self, line: &str, timestamp: NaiveDateTime) -> ReceivedSample {
        let sample = ReceivedSample::new(timestamp, self.antenna.clone(), parse_line(line));
        if !sample.is_decoded() {
            warn!("Unparsed line recorded with empty fields: {:?}", line);
        }

        // Failures are logged by the sink; the next line is still processed
        let _ = self.sink.record(&sample).await;
        self.received += 1;

        info!(
            "Received ts={} seq={:?} lat={:?} lon={:?} rssi={:?} sender={:?}",
            sample.timestamp_text(),
            sample.seq,
            sample.latitude,
            sample.longitude,
            sample.rssi,
            sample.sender
        );
        sample
    }

    /// Receive until `shutdown` resolves, then close both sinks
    ///
    /// # Returns
    ///
    /// * `Result<u64>` - Number of lines recorded
    ///
    /// # Errors
    ///
    /// Returns error if closing the sinks fails.
    pub async fn run<F>(mut self, shutdown: F) -> Result<u64>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Receiving as antenna '{}'", self.antenna);

        loop {
            let deadline = Instant::now() + self.read_timeout;
            let line = tokio::select! {
                _ = &mut shutdown => break,
                line = self.radio.read_line_until(deadline) => line,
            };

            match line {
                Ok(Some(line)) if !line.is_empty() => {
                    let timestamp = Local::now().naive_local();
                    self.ingest(&line, timestamp).await;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Radio read failed: {}", e);
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = sleep(self.read_timeout) => {}
                    }
                }
            }
        }

        info!("Shutting down after {} lines", self.received);
        self.sink.close().await?;
        Ok(self.received)
    }
}

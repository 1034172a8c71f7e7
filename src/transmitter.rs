//! # Transmitter Loop
//!
//! Runs on the field node: each cycle waits briefly for a GPS fix, sends one
//! telemetry record over the radio link, then sleeps until the next cycle.
//!
//! The radio link tolerates silent packet loss, so a failed write is logged
//! and the loop moves on. Losing the positioning receiver ends the loop.

use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info};

use crate::discovery::{resolve_devices, DeviceDirectory, ResolvedDevices, RetryPolicy};
use crate::error::{Result, TelemetryError};
use crate::gnss::{parse_fix, Fix};
use crate::protocol::TelemetryRecord;
use crate::serial::{LineReader, SerialPortIO};

/// Lifecycle of a field node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitterState {
    /// Looking for the positioning and radio devices
    Discovering,
    /// Devices open, loop not started
    Ready,
    /// Steady send loop
    Sending,
    /// Loop ended, handles released with the transmitter
    Closed,
}

impl fmt::Display for TransmitterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discovering => "discovering",
            Self::Ready => "ready",
            Self::Sending => "sending",
            Self::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// Per-node loop parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitterSettings {
    /// Label carried in every record
    pub sender: String,
    /// How long to scan GPS output for a fix each cycle
    pub fix_timeout: Duration,
    /// Pause after each cycle
    pub send_interval: Duration,
}

/// What happened in one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub record: TelemetryRecord,
    /// Whether the record reached the radio link
    pub sent: bool,
}

/// Field node loop context
///
/// Owns the positioning reader, the radio link and the sequence counter for
/// the lifetime of the process.
pub struct Transmitter<G, L> {
    gps: LineReader<G>,
    radio: L,
    settings: TransmitterSettings,
    seq: i64,
    state: TransmitterState,
}

impl<G, L> fmt::Debug for Transmitter<G, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transmitter")
            .field("settings", &self.settings)
            .field("seq", &self.seq)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<G, L> Transmitter<G, L>
where
    G: AsyncRead + Unpin,
    L: SerialPortIO,
{
    /// Create a transmitter over opened devices
    ///
    /// # Arguments
    ///
    /// * `gps` - Byte stream from the positioning receiver
    /// * `radio` - Write side of the radio modem
    /// * `settings` - Sender label and timing
    pub fn new(gps: G, radio: L, settings: TransmitterSettings) -> Self {
        Self {
            gps: LineReader::new(gps),
            radio,
            settings,
            seq: 0,
            state: TransmitterState::Ready,
        }
    }

    /// Discover both devices, open them and return a transmitter in `Ready`
    ///
    /// The node is `Discovering` until both device links resolve; `open` then
    /// turns the resolved paths into the positioning stream and radio link.
    ///
    /// # Arguments
    ///
    /// * `directory` - Where to look for device links
    /// * `positioning_keyword` - Substring identifying the GPS receiver link
    /// * `radio_keyword` - Substring identifying the radio modem link
    /// * `policy` - Attempt bound and delay between scans
    /// * `settings` - Sender label and timing
    /// * `open` - Opens the resolved device paths
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::DeviceNotFound` if discovery runs out of
    /// attempts (`open` is not called), or the error returned by `open`.
    pub async fn discover<D, F>(
        directory: &D,
        positioning_keyword: &str,
        radio_keyword: &str,
        policy: &RetryPolicy,
        settings: TransmitterSettings,
        open: F,
    ) -> Result<Self>
    where
        D: DeviceDirectory,
        F: FnOnce(&ResolvedDevices) -> Result<(G, L)>,
    {
        info!("State: {}", TransmitterState::Discovering);
        let devices = resolve_devices(directory, positioning_keyword, radio_keyword, policy).await?;
        info!("GPS receiver: {}", devices.positioning.display());
        info!("Radio modem: {}", devices.radio.display());

        let (gps, radio) = open(&devices)?;
        let transmitter = Self::new(gps, radio, settings);
        info!("State: {}", transmitter.state);
        Ok(transmitter)
    }

    pub fn state(&self) -> TransmitterState {
        self.state
    }

    /// Sequence number the next record will carry (equals cycles completed)
    pub fn next_seq(&self) -> i64 {
        self.seq
    }

    /// Scan positioning output for a fix until one is found or the fix
    /// timeout elapses
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::Serial` if the positioning receiver cannot
    /// be read (unplugged or closed).
    pub async fn acquire_fix(&mut self) -> Result<Option<Fix>> {
        let deadline = Instant::now() + self.settings.fix_timeout;
        loop {
            match self.gps.read_line_until(deadline).await {
                Ok(Some(line)) => {
                    if let Some(fix) = parse_fix(&line) {
                        return Ok(Some(fix));
                    }
                }
                Ok(None) => return Ok(None),
                Err(e) => {
                    return Err(TelemetryError::Serial(format!(
                        "Positioning receiver read failed: {}",
                        e
                    )))
                }
            }
        }
    }

    /// Run one cycle: acquire a fix, build the record, send it
    ///
    /// The sequence number advances once per cycle whether or not a fix was
    /// found or the write succeeded.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let fix = self.acquire_fix().await?;
        if fix.is_none() {
            debug!("No fix within {:?}", self.settings.fix_timeout);
        }

        let record = TelemetryRecord::new(self.seq, fix, self.settings.sender.clone());
        self.seq += 1;

        let sent = match self.send(&record).await {
            Ok(()) => {
                info!("Sent {}", record);
                true
            }
            Err(e) => {
                error!("Send failed for seq {}: {}", record.seq, e);
                false
            }
        };

        Ok(CycleReport { record, sent })
    }

    async fn send(&mut self, record: &TelemetryRecord) -> io::Result<()> {
        self.radio.write_all(&record.to_frame()).await?;
        self.radio.flush().await
    }

    async fn cycle_then_wait(&mut self) -> Result<()> {
        self.run_cycle().await?;
        sleep(self.settings.send_interval).await;
        Ok(())
    }

    /// Run the send loop until `shutdown` resolves or a fault occurs
    ///
    /// # Errors
    ///
    /// Returns the fault that ended the loop; the state is `Closed` either
    /// way.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.state = TransmitterState::Sending;
        info!(
            "Sending as '{}' every {:?}",
            self.settings.sender, self.settings.send_interval
        );

        let result = loop {
            let cycle = tokio::select! {
                _ = &mut shutdown => None,
                cycle = self.cycle_then_wait() => Some(cycle),
            };

            match cycle {
                None => {
                    info!("Shutdown requested after {} cycles", self.seq);
                    break Ok(());
                }
                Some(Err(e)) => {
                    error!("Unexpected fault at seq {}: {}", self.seq, e);
                    break Err(e);
                }
                Some(Ok(())) => {}
            }
        };

        self.state = TransmitterState::Closed;
        result
    }
}

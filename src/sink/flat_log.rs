//! Append-only CSV sample log

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::Result;
use crate::protocol::ReceivedSample;

/// Column names, in row order
pub const HEADER: [&str; 7] = [
    "timestamp",
    "seq",
    "latitude",
    "longitude",
    "rssi",
    "antenna",
    "sender",
];

/// CSV log with one row per received sample
///
/// Every row is flushed and synced before `append` returns, so a killed
/// process leaves no buffered row behind.
#[derive(Debug)]
pub struct FlatLog {
    file: File,
    path: PathBuf,
}

impl FlatLog {
    /// Open the log for appending, writing the header if the file is new
    ///
    /// An existing, non-empty file keeps its header and rows untouched.
    pub async fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let is_new = file.metadata().await?.len() == 0;

        let mut log = Self {
            file,
            path: path.to_path_buf(),
        };
        if is_new {
            log.write_line(&HEADER.join(",")).await?;
            info!("Created sample log {}", path.display());
        } else {
            info!("Appending to sample log {}", path.display());
        }

        Ok(log)
    }

    /// Append one sample row
    pub async fn append(&mut self, sample: &ReceivedSample) -> Result<()> {
        self.write_line(&format_row(sample)).await
    }

    /// Flush and sync before the handle is dropped
    pub async fn close(mut self) -> Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        info!("Closed sample log {}", self.path.display());
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.file.write_all(line.as_bytes()).await?;
        self.file.write_all(b"\r\n").await?;
        self.file.flush().await?;
        self.file.sync_data().await?;
        Ok(())
    }
}

/// Render a sample as one CSV row (no terminator); NULL is an empty cell
pub fn format_row(sample: &ReceivedSample) -> String {
    let cells = [
        sample.timestamp_text(),
        optional(sample.seq.map(|v| v.to_string())),
        optional(sample.latitude.map(format_float)),
        optional(sample.longitude.map(format_float)),
        optional(sample.rssi.map(format_float)),
        sample.antenna.clone(),
        optional(sample.sender.clone()),
    ];

    cells
        .iter()
        .map(|cell| escape(cell))
        .collect::<Vec<_>>()
        .join(",")
}

fn optional(value: Option<String>) -> String {
    value.unwrap_or_default()
}

/// Shortest representation that keeps a decimal point (`-42.0`, `35.6812`)
fn format_float(value: f64) -> String {
    format!("{:?}", value)
}

fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

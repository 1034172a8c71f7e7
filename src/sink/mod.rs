//! # Persistence Sink
//!
//! Base-station storage of received samples.
//!
//! This module handles:
//! - A durable SQLite store (`gps_log` table)
//! - An append-only CSV log flushed after every row
//!
//! The two sinks are written one after the other without a transaction; a
//! crash between the writes can leave a sample in only one of them.

pub mod flat_log;
pub mod store;

pub use flat_log::FlatLog;
pub use store::SampleStore;

use std::path::Path;

use tracing::error;

use crate::error::Result;
use crate::protocol::ReceivedSample;

/// Both sample sinks, owned together for the receiver's lifetime
#[derive(Debug)]
pub struct PersistenceSink {
    store: SampleStore,
    log: FlatLog,
}

impl PersistenceSink {
    /// Open the store and the log
    ///
    /// # Arguments
    ///
    /// * `store_path` - SQLite database file (created if missing)
    /// * `log_path` - CSV log file (created with a header if missing)
    ///
    /// # Errors
    ///
    /// Returns error if either sink cannot be opened.
    pub async fn open(store_path: &Path, log_path: &Path) -> Result<Self> {
        let store = SampleStore::open(store_path).await?;
        let log = match FlatLog::open(log_path).await {
            Ok(log) => log,
            Err(e) => {
                store.close().await;
                return Err(e);
            }
        };
        Ok(Self { store, log })
    }

    /// Record one sample in both sinks
    ///
    /// Both appends are attempted even if the first fails. Each failure is
    /// logged; the first one is returned.
    pub async fn record(&mut self, sample: &ReceivedSample) -> Result<()> {
        let stored = self.store.insert(sample).await.map(|_| ());
        if let Err(e) = &stored {
            error!("Store insert failed at {}: {}", sample.timestamp_text(), e);
        }

        let logged = self.log.append(sample).await;
        if let Err(e) = &logged {
            error!("Log append failed at {}: {}", sample.timestamp_text(), e);
        }

        stored.and(logged)
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    /// Close the store connection and the log file
    pub async fn close(self) -> Result<()> {
        self.store.close().await;
        self.log.close().await
    }
}

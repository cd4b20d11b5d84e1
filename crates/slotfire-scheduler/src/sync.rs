use std::sync::Arc;
use std::time::Duration;

use slotfire_client::ClockSource;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::offset::ClockOffset;

/// Keeps a [`ClockOffset`] fresh by querying a [`ClockSource`] on a fixed interval.
///
/// A failed query is logged and leaves the last good offset in place.
pub struct ClockSyncService {
    source: Arc<dyn ClockSource>,
    offset: ClockOffset,
    interval: Duration,
}

impl ClockSyncService {
    pub fn new(source: Arc<dyn ClockSource>, offset: ClockOffset, interval: Duration) -> Self {
        Self {
            source,
            offset,
            interval,
        }
    }

    /// The cell this service writes to.
    pub fn offset(&self) -> &ClockOffset {
        &self.offset
    }

    /// One query. Returns `true` when a new offset was published.
    pub async fn sync_once(&self) -> bool {
        match self.source.query_offset().await {
            Ok(offset) => {
                self.offset.publish(offset);
                info!(
                    source = self.source.name(),
                    offset_ms = offset.num_milliseconds(),
                    "clock offset updated"
                );
                true
            }
            Err(e) => {
                warn!(
                    source = self.source.name(),
                    error = %e,
                    kept_offset_ms = self.offset.millis(),
                    "clock sync failed, keeping previous offset"
                );
                false
            }
        }
    }

    /// Re-sync every `interval` until `cancel` fires. The first query happens
    /// one interval after start; call [`Self::sync_once`] beforehand for an
    /// immediate reading.
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "clock sync started");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("clock sync shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {
                    self.sync_once().await;
                }
            }
        }
    }
}

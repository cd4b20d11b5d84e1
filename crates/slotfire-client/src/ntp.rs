//! Reference clock: one SNTP round trip per query, via `rsntp`.

use std::time::Duration;

use async_trait::async_trait;
use rsntp::AsyncSntpClient;
use tracing::debug;

use crate::error::ClockError;

/// Anything that can report `reference - local` wall-clock offset.
#[async_trait]
pub trait ClockSource: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Perform one query and return the offset to add to local time.
    async fn query_offset(&self) -> Result<chrono::Duration, ClockError>;
}

/// SNTP client for a single `host:port` server.
pub struct SntpClock {
    server: String,
    timeout: Duration,
}

impl SntpClock {
    pub fn new(server: impl Into<String>, timeout: Duration) -> Self {
        Self {
            server: server.into(),
            timeout,
        }
    }

    async fn exchange(&self) -> Result<chrono::Duration, ClockError> {
        let mut client = AsyncSntpClient::new();
        client.set_timeout(self.timeout);

        let result = client
            .synchronize(self.server.as_str())
            .await
            .map_err(|e| ClockError::Sntp(e.to_string()))?;

        let offset = seconds_to_duration(result.clock_offset().as_secs_f64());
        debug!(
            server = %self.server,
            stratum = result.stratum(),
            delay_ms = seconds_to_duration(result.round_trip_delay().as_secs_f64())
                .num_milliseconds(),
            offset_ms = offset.num_milliseconds(),
            "sntp reply"
        );
        Ok(offset)
    }
}

#[async_trait]
impl ClockSource for SntpClock {
    fn name(&self) -> &str {
        &self.server
    }

    async fn query_offset(&self) -> Result<chrono::Duration, ClockError> {
        tokio::time::timeout(self.timeout, self.exchange())
            .await
            .map_err(|_| ClockError::Timeout {
                ms: self.timeout.as_millis() as u64,
            })?
    }
}

fn seconds_to_duration(secs: f64) -> chrono::Duration {
    chrono::Duration::nanoseconds((secs * 1e9).round() as i64)
}

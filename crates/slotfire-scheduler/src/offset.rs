use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;

/// Published `reference - local` clock offset.
///
/// Cloning shares the same cell. One writer ([`crate::ClockSyncService`])
/// publishes whole values; any number of schedulers read them. The value is
/// a single `AtomicI64` of nanoseconds, so a reader sees either the initial
/// zero or some complete published offset.
#[derive(Debug, Clone, Default)]
pub struct ClockOffset {
    nanos: Arc<AtomicI64>,
}

impl ClockOffset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, offset: chrono::Duration) {
        // ±292 years fits; anything beyond is clamped
        let nanos = offset.num_nanoseconds().unwrap_or(if offset < chrono::Duration::zero() {
            i64::MIN
        } else {
            i64::MAX
        });
        self.nanos.store(nanos, Ordering::Release);
    }

    pub fn get(&self) -> chrono::Duration {
        chrono::Duration::nanoseconds(self.nanos.load(Ordering::Acquire))
    }

    pub fn millis(&self) -> i64 {
        self.nanos.load(Ordering::Acquire) / 1_000_000
    }
}

/// Source of local wall-clock time in Unix milliseconds.
pub trait WallClock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// The process's real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

use std::sync::Arc;
use std::time::Duration;

use slotfire_client::{ClientError, ReservationClient, ReserveRequest, ReserveResponse};
use slotfire_core::ReservationJob;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::offset::{ClockOffset, WallClock};
use crate::types::{Outcome, RetryPolicy, SchedulerState};

/// Sleep for half the remaining time, never less than 1 ms.
///
/// Repeated halving approaches the deadline geometrically: coarse sleeps far
/// from it, fine ones close to it. The floor keeps a 1 ms remainder from
/// turning into a zero-length sleep loop.
pub fn converging_wait(remaining_ms: i64) -> Duration {
    Duration::from_millis((remaining_ms / 2).max(1) as u64)
}

/// Fires one [`ReservationJob`] at its open time and retries until it succeeds.
///
/// Never sends a request while `local now + offset` is before the open time.
pub struct ReservationScheduler {
    job: ReservationJob,
    label: String,
    client: Arc<dyn ReservationClient>,
    offset: ClockOffset,
    wall: Arc<dyn WallClock>,
    policy: RetryPolicy,
    state: watch::Sender<SchedulerState>,
}

impl ReservationScheduler {
    pub fn new(
        job: ReservationJob,
        client: Arc<dyn ReservationClient>,
        offset: ClockOffset,
        wall: Arc<dyn WallClock>,
        policy: RetryPolicy,
    ) -> Self {
        let label = format!("target {}", job.target_id);
        let (state, _) = watch::channel(SchedulerState::Waiting);
        Self {
            job,
            label,
            client,
            offset,
            wall,
            policy,
            state,
        }
    }

    /// Human readable name used in every log line of this scheduler.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn job(&self) -> &ReservationJob {
        &self.job
    }

    /// Observe state transitions. The current state is available immediately.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    fn corrected_now_millis(&self) -> i64 {
        self.wall.now_millis() + self.offset.millis()
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                debug!(label = %self.label, from = %current, to = %state, "state changed");
                *current = state;
                true
            }
        });
    }

    fn finish(&self, outcome: Outcome) -> Outcome {
        self.set_state(outcome.state());
        outcome
    }

    async fn attempt(&self, req: &ReserveRequest) -> Result<ReserveResponse, ClientError> {
        tokio::time::timeout(self.policy.attempt_timeout, self.client.reserve(req))
            .await
            .map_err(|_| ClientError::Timeout {
                ms: self.policy.attempt_timeout.as_millis() as u64,
            })?
    }

    /// Drive the job to a terminal [`Outcome`].
    pub async fn run(self, cancel: CancellationToken) -> Outcome {
        let target_ms = self.job.open_at_millis();
        let req = ReserveRequest {
            token: self.job.token.clone(),
            target_id: self.job.target_id,
            ticket_id: self.job.ticket_id.clone(),
        };
        let mut attempts: u32 = 0;

        info!(
            label = %self.label,
            target_id = %self.job.target_id,
            open_at = ?self.job.open_at_utc(),
            "scheduler started"
        );

        loop {
            let now_ms = self.corrected_now_millis();
            let remaining = target_ms - now_ms;

            if remaining > 0 {
                self.set_state(SchedulerState::Waiting);
                let wait = converging_wait(remaining);
                info!(
                    label = %self.label,
                    remaining_ms = remaining,
                    wait_ms = wait.as_millis() as u64,
                    offset_ms = self.offset.millis(),
                    "waiting for reservation to open"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return self.finish(Outcome::Cancelled { attempts }),
                    _ = tokio::time::sleep(wait) => continue,
                }
            }

            self.set_state(SchedulerState::Attempting);
            attempts += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.finish(Outcome::Cancelled { attempts }),
                r = self.attempt(&req) => r,
            };

            match result {
                Ok(resp) if resp.is_success() => {
                    info!(
                        label = %self.label,
                        attempts,
                        message = %resp.message,
                        "reservation succeeded"
                    );
                    return self.finish(Outcome::Succeeded { attempts });
                }
                Ok(resp) => {
                    warn!(
                        label = %self.label,
                        attempt = attempts,
                        code = resp.code,
                        message = %resp.message,
                        "reservation rejected, retrying"
                    );
                }
                Err(e) => {
                    warn!(
                        label = %self.label,
                        attempt = attempts,
                        error = %e,
                        "reservation failed, retrying"
                    );
                }
            }

            if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                warn!(label = %self.label, attempts, "retry budget exhausted");
                return self.finish(Outcome::Exhausted { attempts });
            }

            if self.policy.retry_delay.is_zero() {
                tokio::task::yield_now().await;
                if cancel.is_cancelled() {
                    return self.finish(Outcome::Cancelled { attempts });
                }
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return self.finish(Outcome::Cancelled { attempts }),
                    _ = tokio::time::sleep(self.policy.retry_delay) => {}
                }
            }
        }
    }
}

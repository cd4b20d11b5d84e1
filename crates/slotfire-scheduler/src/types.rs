use std::time::Duration;

use serde::Serialize;
use slotfire_core::config::RetryConfig;

/// Lifecycle state of one reservation scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Sleeping toward the open time.
    Waiting,
    /// A reservation request is in flight.
    Attempting,
    Succeeded,
    Cancelled,
    /// `max_attempts` reached without success.
    Exhausted,
}

impl SchedulerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled | Self::Exhausted)
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SchedulerState::Waiting => "waiting",
            SchedulerState::Attempting => "attempting",
            SchedulerState::Succeeded => "succeeded",
            SchedulerState::Cancelled => "cancelled",
            SchedulerState::Exhausted => "exhausted",
        };
        write!(f, "{s}")
    }
}

/// How a scheduler finished, with the number of requests it sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded { attempts: u32 },
    Cancelled { attempts: u32 },
    Exhausted { attempts: u32 },
}

impl Outcome {
    pub fn attempts(&self) -> u32 {
        match *self {
            Outcome::Succeeded { attempts }
            | Outcome::Cancelled { attempts }
            | Outcome::Exhausted { attempts } => attempts,
        }
    }

    pub fn state(&self) -> SchedulerState {
        match self {
            Outcome::Succeeded { .. } => SchedulerState::Succeeded,
            Outcome::Cancelled { .. } => SchedulerState::Cancelled,
            Outcome::Exhausted { .. } => SchedulerState::Exhausted,
        }
    }
}

/// Per-attempt limits shared by every scheduler.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempt_timeout: Duration,
    /// `None` retries until success or cancellation.
    pub max_attempts: Option<u32>,
    /// Zero retries immediately (after yielding to the runtime).
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            attempt_timeout: Duration::from_millis(cfg.attempt_timeout_ms),
            max_attempts: cfg.max_attempts,
            retry_delay: Duration::from_millis(cfg.retry_delay_ms),
        }
    }
}

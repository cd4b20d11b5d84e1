//! `slotfire-scheduler`: time-synchronised dispatch of reservation requests.
//!
//! # Overview
//!
//! A [`ClockSyncService`] keeps a shared [`ClockOffset`] (reference − local
//! time) fresh. Each [`ReservationScheduler`] reads that offset, sleeps toward
//! its job's open time by repeatedly halving the remaining wait, then sends
//! the reservation request until the service accepts it. The [`Dispatcher`]
//! runs one scheduler per job and the clock sync beside them.
//!
//! # Scheduler states
//!
//! | State        | Meaning                                          |
//! |--------------|--------------------------------------------------|
//! | `Waiting`    | Corrected time is still before the open time     |
//! | `Attempting` | A request is in flight                           |
//! | `Succeeded`  | The service returned code 0 (terminal)           |
//! | `Cancelled`  | The cancellation token fired (terminal)          |
//! | `Exhausted`  | `max_attempts` was configured and hit (terminal) |

pub mod dispatcher;
pub mod engine;
pub mod offset;
pub mod sync;
pub mod types;

#[cfg(test)]
mod testing;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use engine::{converging_wait, ReservationScheduler};
pub use offset::{ClockOffset, SystemClock, WallClock};
pub use sync::ClockSyncService;
pub use types::{Outcome, RetryPolicy, SchedulerState};

//! `slotfire-client`: the remote collaborators the scheduler talks to.
//!
//! | Trait               | Implementation           | Transport          |
//! |---------------------|--------------------------|--------------------|
//! | `ReservationClient` | `HttpReservationClient`  | HTTPS via reqwest  |
//! | `ClockSource`       | `SntpClock`              | SNTP via rsntp     |

pub mod error;
pub mod http;
pub mod ntp;
pub mod reservation;

pub use error::{ClientError, ClockError};
pub use http::HttpReservationClient;
pub use ntp::{ClockSource, SntpClock};
pub use reservation::{ReservationClient, ReserveRequest, ReserveResponse};

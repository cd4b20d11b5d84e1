//! `slotfire-core`: configuration, domain types and startup lookup tables.
//!
//! Nothing in this crate performs network I/O.

pub mod config;
pub mod cookie;
pub mod error;
pub mod registry;
pub mod types;

pub use config::SlotfireConfig;
pub use error::{Result, SlotfireError};
pub use registry::{NameIndex, Resolved, TargetRegistry, TicketInventory};
pub use types::{Catalog, CatalogResponse, ReservationJob, TargetId, TicketInfo};

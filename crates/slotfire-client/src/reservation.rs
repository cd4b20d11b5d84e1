use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slotfire_core::{Catalog, TargetId};

use crate::error::ClientError;

/// One reservation attempt as sent to the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveRequest {
    pub token: String,
    pub target_id: TargetId,
    pub ticket_id: String,
}

/// Application-level reply. `code == 0` means the slot was reserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReserveResponse {
    pub code: i64,
    pub message: String,
}

impl ReserveResponse {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// The remote reservation service.
///
/// Implementations must be cheap to share: one instance is used by every
/// scheduler concurrently.
#[async_trait]
pub trait ReservationClient: Send + Sync {
    /// Name for logging and error messages.
    fn name(&self) -> &str;

    /// Submit a single reservation attempt.
    ///
    /// Transport failures are `Err`; a rejection by the service is an `Ok`
    /// response with a non-zero code.
    async fn reserve(&self, req: &ReserveRequest) -> Result<ReserveResponse, ClientError>;

    /// Fetch the target catalog and the caller's tickets.
    async fn fetch_catalog(&self, token: &str) -> Result<Catalog, ClientError>;
}

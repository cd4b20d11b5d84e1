use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Integer id of a reservable slot/event on the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub i64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One reservation to fire. Built once at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationJob {
    pub target_id: TargetId,
    pub ticket_id: String,
    /// CSRF token derived from the session cookie.
    pub token: String,
    /// Unix seconds at which the remote side starts accepting the reservation.
    pub open_at: i64,
}

impl ReservationJob {
    pub fn open_at_millis(&self) -> i64 {
        self.open_at.saturating_mul(1000)
    }

    pub fn open_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.open_at, 0)
    }
}

// --- catalog wire shapes -----------------------------------------------------

/// Envelope returned by the catalog (reserve info) endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogResponse {
    pub code: i64,
    pub message: String,
    pub ttl: i64,
    pub data: Catalog,
}

impl CatalogResponse {
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub user_reserve_info: HashMap<String, ReserveQuota>,
    /// Tickets the caller currently holds, keyed by an opaque server key.
    pub user_ticket_info: HashMap<String, TicketInfo>,
    /// Reservable targets grouped by date (YYYYMMDD).
    pub reserve_list: HashMap<String, Vec<ReserveDetail>>,
}

impl Catalog {
    /// Every target in the catalog regardless of date bucket.
    pub fn targets(&self) -> impl Iterator<Item = &ReserveDetail> {
        self.reserve_list.values().flatten()
    }

    pub fn find_target(&self, id: TargetId) -> Option<&ReserveDetail> {
        self.targets().find(|t| t.reserve_id == id.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReserveQuota {
    pub total_count: i64,
    pub cur_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketInfo {
    pub sid: i64,
    pub sku_name: String,
    pub screen_name: String,
    #[serde(rename = "type")]
    pub kind: i64,
    pub ticket: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReserveDetail {
    pub reserve_id: i64,
    pub act_type: String,
    pub act_title: String,
    pub act_img: String,
    pub act_begin_time: i64,
    pub act_end_time: i64,
    pub reserve_begin_time: i64,
    pub reserve_end_time: i64,
    pub describe_info: String,
    pub vip_ticket_num: i64,
    pub standard_ticket_num: i64,
    pub screen_date: i64,
    pub is_vip_ticket: i64,
    pub state: i64,
    pub online_state: i64,
    pub display_index: i64,
    pub vip_stock: i64,
    pub standard_stock: i64,
    pub next_reserve: NextReserve,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NextReserve {
    pub reserve_begin_time: i64,
    pub reserve_end_time: i64,
    pub is_vip_ticket: i64,
}

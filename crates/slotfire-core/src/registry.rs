//! Startup-time lookup tables: which ticket goes to which target, when each
//! target opens, and the display names used in log lines.
//!
//! Everything here is built once and read-only afterwards.

use std::collections::{BTreeMap, HashMap};

use tracing::{error, info};

use crate::config::SlotfireConfig;
use crate::cookie::extract_field;
use crate::error::{Result, SlotfireError};
use crate::types::{Catalog, ReservationJob, TargetId, TicketInfo};

/// Configured target → ticket pairs plus the CSRF token they are fired with.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    entries: BTreeMap<TargetId, String>,
    token: String,
}

/// Result of matching the registry against a fetched catalog.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    pub jobs: Vec<ReservationJob>,
    /// Configured targets the catalog does not know about.
    pub missing: Vec<TargetId>,
}

impl TargetRegistry {
    /// Build the registry from a loaded config.
    ///
    /// Fails when a job key is not an integer or the cookie carries no CSRF token.
    pub fn from_config(config: &SlotfireConfig) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (key, ticket) in &config.job {
            let id = key
                .trim()
                .parse::<i64>()
                .map_err(|e| SlotfireError::InvalidTargetId {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
            entries.insert(TargetId(id), ticket.clone());
        }

        let token = extract_field(&config.cookie, &config.endpoints.csrf_cookie_field)?;
        Ok(Self { entries, token })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetId, &str)> {
        self.entries.iter().map(|(id, t)| (*id, t.as_str()))
    }

    /// Attach each target's open time from the catalog.
    ///
    /// Targets missing from the catalog are logged and left out of `jobs`.
    pub fn resolve(&self, catalog: &Catalog) -> Resolved {
        let mut resolved = Resolved::default();
        for (target_id, ticket_id) in self.iter() {
            match catalog.find_target(target_id) {
                Some(detail) => resolved.jobs.push(ReservationJob {
                    target_id,
                    ticket_id: ticket_id.to_string(),
                    token: self.token.clone(),
                    open_at: detail.reserve_begin_time,
                }),
                None => {
                    error!(%target_id, ticket_id, "target not found in catalog, skipping");
                    resolved.missing.push(target_id);
                }
            }
        }
        resolved
    }
}

/// Tickets the caller holds, keyed by ticket id. Used for log labels only.
#[derive(Debug, Clone, Default)]
pub struct TicketInventory {
    tickets: HashMap<String, TicketInfo>,
}

impl TicketInventory {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let tickets = catalog
            .user_ticket_info
            .values()
            .map(|t| (t.ticket.clone(), t.clone()))
            .collect();
        Self { tickets }
    }

    pub fn get(&self, ticket_id: &str) -> Option<&TicketInfo> {
        self.tickets.get(ticket_id)
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Log every available ticket once at startup.
    pub fn log_available(&self) {
        for t in self.tickets.values() {
            info!(
                sku = %t.sku_name,
                ticket = %t.ticket,
                screen = %t.screen_name,
                "available ticket"
            );
        }
    }
}

/// Target id → human readable title.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    titles: HashMap<TargetId, String>,
}

impl NameIndex {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let titles = catalog
            .targets()
            .map(|t| (TargetId(t.reserve_id), t.act_title.clone()))
            .collect();
        Self { titles }
    }

    pub fn title(&self, id: TargetId) -> Option<&str> {
        self.titles.get(&id).map(String::as_str)
    }

    /// `"<title> @ <screen>"` label for a job, with fallbacks for unknown ids.
    pub fn label(&self, job: &ReservationJob, inventory: &TicketInventory) -> String {
        let title = self
            .title(job.target_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("target {}", job.target_id));
        match inventory.get(&job.ticket_id) {
            Some(ticket) if !ticket.screen_name.is_empty() => {
                format!("{title} @ {}", ticket.screen_name)
            }
            _ => title,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CatalogResponse, ReserveDetail};

    fn catalog() -> Catalog {
        CatalogResponse::from_json(
            r#"{"code": 0, "data": {
                "user_ticket_info": {"x": {"ticket": "abc", "screen_name": "Hall A", "sku_name": "Day 1"}},
                "reserve_list": {"20240712": [
                    {"reserve_id": 5, "act_title": "Stage show", "reserve_begin_time": 1700000000}
                ]}
            }}"#,
        )
        .unwrap()
        .data
    }

    #[test]
    fn single_job_from_minimal_config() {
        let cfg =
            SlotfireConfig::from_json_str(r#"{"job": {"5": "abc"}, "cookie": "bili_jct=XYZ"}"#)
                .unwrap();
        let registry = TargetRegistry::from_config(&cfg).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.token(), "XYZ");

        let resolved = registry.resolve(&catalog());
        assert!(resolved.missing.is_empty());
        assert_eq!(
            resolved.jobs,
            vec![ReservationJob {
                target_id: TargetId(5),
                ticket_id: "abc".to_string(),
                token: "XYZ".to_string(),
                open_at: 1_700_000_000,
            }]
        );
    }

    #[test]
    fn non_integer_key_is_rejected() {
        let cfg =
            SlotfireConfig::from_json_str(r#"{"job": {"five": "abc"}, "cookie": "bili_jct=XYZ"}"#)
                .unwrap();
        let err = TargetRegistry::from_config(&cfg).unwrap_err();
        assert_eq!(err.code(), "INVALID_TARGET_ID");
    }

    #[test]
    fn missing_token_is_rejected() {
        let cfg = SlotfireConfig::from_json_str(r#"{"job": {"5": "abc"}, "cookie": "SESSDATA=1"}"#)
            .unwrap();
        let err = TargetRegistry::from_config(&cfg).unwrap_err();
        assert_eq!(err.code(), "COOKIE_FIELD_NOT_FOUND");
    }

    #[test]
    fn unknown_target_is_reported_missing() {
        let cfg = SlotfireConfig::from_json_str(
            r#"{"job": {"5": "abc", "9": "def"}, "cookie": "bili_jct=XYZ"}"#,
        )
        .unwrap();
        let resolved = TargetRegistry::from_config(&cfg).unwrap().resolve(&catalog());
        assert_eq!(resolved.jobs.len(), 1);
        assert_eq!(resolved.missing, vec![TargetId(9)]);
    }

    #[test]
    fn labels_combine_title_and_screen() {
        let catalog = catalog();
        let names = NameIndex::from_catalog(&catalog);
        let inventory = TicketInventory::from_catalog(&catalog);
        assert_eq!(inventory.len(), 1);

        let mut job = ReservationJob {
            target_id: TargetId(5),
            ticket_id: "abc".into(),
            token: "XYZ".into(),
            open_at: 0,
        };
        assert_eq!(names.label(&job, &inventory), "Stage show @ Hall A");

        job.target_id = TargetId(77);
        job.ticket_id = "unknown".into();
        assert_eq!(names.label(&job, &inventory), "target 77");
    }

    #[test]
    fn name_index_spans_all_dates() {
        let mut catalog = catalog();
        catalog.reserve_list.insert(
            "20240713".into(),
            vec![ReserveDetail {
                reserve_id: 6,
                act_title: "Signing".into(),
                ..Default::default()
            }],
        );
        let names = NameIndex::from_catalog(&catalog);
        assert_eq!(names.title(TargetId(5)), Some("Stage show"));
        assert_eq!(names.title(TargetId(6)), Some("Signing"));
    }
}

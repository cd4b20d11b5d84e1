use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SlotfireError};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_NTP_SERVER: &str = "ntp.aliyun.com:123";
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 3600; // hourly offset refresh
pub const DEFAULT_NTP_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CSRF_FIELD: &str = "bili_jct";

const DEFAULT_CATALOG_URL: &str =
    "https://api.bilibili.com/x/activity/bws/online/park/reserve/info";
const DEFAULT_RESERVE_URL: &str = "https://api.bilibili.com/x/activity/bws/online/park/reserve/do";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/618.1.15.10.15 (KHTML, like Gecko) Mobile/21F90 BiliApp/77900100 os/ios model/iPhone 15 mobi_app/iphone build/77900100 osVer/17.5.1 network/2 channel/AppStore c_locale/zh-Hans_CN s_locale/zh-Hans_CH disable_rcmd/0123";

/// Top-level config (config.json + SLOTFIRE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotfireConfig {
    /// Target id (as written in JSON, always a string key) → ticket id.
    #[serde(deserialize_with = "text_map")]
    pub job: BTreeMap<String, String>,
    /// Raw session cookie string, sent verbatim as the `Cookie` header.
    #[serde(deserialize_with = "text")]
    pub cookie: String,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Remote service locations and request decoration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,
    #[serde(default = "default_reserve_url")]
    pub reserve_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Dates (YYYYMMDD) requested from the catalog endpoint.
    #[serde(default = "default_reserve_dates")]
    pub reserve_dates: Vec<String>,
    /// Cookie field that carries the CSRF token.
    #[serde(default = "default_csrf_field")]
    pub csrf_cookie_field: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            reserve_url: default_reserve_url(),
            user_agent: default_user_agent(),
            reserve_dates: default_reserve_dates(),
            csrf_cookie_field: default_csrf_field(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// `host:port` of the SNTP server used as the reference clock.
    #[serde(default = "default_ntp_server")]
    pub ntp_server: String,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_ntp_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            ntp_server: default_ntp_server(),
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            query_timeout_ms: DEFAULT_NTP_TIMEOUT_MS,
        }
    }
}

impl ClockConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Per-attempt behaviour of every reservation scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Upper bound on a single reservation request.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Give up after this many attempts. Absent means retry forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Pause between a failed attempt and the next one. 0 retries immediately.
    #[serde(default)]
    pub retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT_MS,
            max_attempts: None,
            retry_delay_ms: 0,
        }
    }
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}
fn default_reserve_url() -> String {
    DEFAULT_RESERVE_URL.to_string()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_reserve_dates() -> Vec<String> {
    ["20240712", "20240713", "20240714"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}
fn default_csrf_field() -> String {
    DEFAULT_CSRF_FIELD.to_string()
}
fn default_ntp_server() -> String {
    DEFAULT_NTP_SERVER.to_string()
}
fn default_sync_interval_secs() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}
fn default_ntp_timeout_ms() -> u64 {
    DEFAULT_NTP_TIMEOUT_MS
}
fn default_attempt_timeout_ms() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT_MS
}

/// A string field as figment may hand it over. The env provider parses
/// `SLOTFIRE_JOB__7=12345` into an integer, so scalars are read back as text.
/// Quote a value (`SLOTFIRE_JOB__7='"007"'`) to keep leading zeros.
#[derive(Deserialize)]
#[serde(untagged)]
enum Text {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl From<Text> for String {
    fn from(t: Text) -> Self {
        match t {
            Text::Str(s) => s,
            Text::Int(v) => v.to_string(),
            Text::UInt(v) => v.to_string(),
            Text::Float(v) => v.to_string(),
            Text::Bool(v) => v.to_string(),
        }
    }
}

fn text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Text::deserialize(d).map(String::from)
}

fn text_map<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<BTreeMap<String, String>, D::Error> {
    let raw = BTreeMap::<String, Text>::deserialize(d)?;
    Ok(raw.into_iter().map(|(k, v)| (k, v.into())).collect())
}

impl SlotfireConfig {
    /// Load config from a JSON file with SLOTFIRE_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `SLOTFIRE_RETRY__MAX_ATTEMPTS=50`.
    /// A missing file is an error rather than an empty layer.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);
        if !Path::new(path).is_file() {
            return Err(SlotfireError::Config(format!(
                "config file not found: {path}"
            )));
        }

        Figment::new()
            .merge(Json::file(path))
            .merge(Env::prefixed("SLOTFIRE_").split("__"))
            .extract()
            .map_err(|e| SlotfireError::Config(e.to_string()))
    }

    /// Parse config from an in-memory JSON document (no env layer).
    pub fn from_json_str(json: &str) -> Result<Self> {
        Figment::from(Json::string(json))
            .extract()
            .map_err(|e| SlotfireError::Config(e.to_string()))
    }
}

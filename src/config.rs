//! Configuration for the validator sentinel
//!
//! Compile-time defaults plus env-driven runtime settings.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::alerts::InactivityResetPolicy;

// ====== Monitoring Configuration ======

/// Default cycle interval in seconds
pub const DEFAULT_MONITOR_INTERVAL: u64 = 300;

/// Minimum cycle interval in seconds
pub const MIN_MONITOR_INTERVAL: u64 = 10;

/// Maximum cycle interval in seconds
pub const MAX_MONITOR_INTERVAL: u64 = 86_400;

/// Default per-validator alert cooldown in days
pub const DEFAULT_COOLDOWN_DAYS: i64 = 14;

/// Default inactivity threshold ladder (performance percent)
pub const DEFAULT_INACTIVITY_THRESHOLDS: &[u32] = &[10, 25, 50];

/// Maximum concurrent snapshot fetches per cycle
pub const MAX_CONCURRENT_FETCHES: usize = 16;

// ====== Chain / Transport Configuration ======

/// Default substrate-api-sidecar endpoint
pub const DEFAULT_CHAIN_API_URL: &str = "http://127.0.0.1:8080";

/// Default SS58 prefix used for address validation
pub const DEFAULT_SS58_PREFIX: u16 = 87;

/// HTTP request timeout for chain and Discord calls
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

// ====== Storage ======

/// Registry document file name inside the data directory
pub const VALIDATORS_DB_FILE: &str = "validators.json";

/// SQLite database (subscriptions + alert history) inside the data directory
pub const SENTINEL_DB_FILE: &str = "sentinel.db";

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse_u64(name: &str, default: u64, min: u64, max: u64) -> u64 {
    match env_var(name).and_then(|v| v.parse::<u64>().ok()) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

fn env_parse_usize(name: &str, default: usize, min: usize, max: usize) -> usize {
    match env_var(name).and_then(|v| v.parse::<usize>().ok()) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

fn env_parse_u16(name: &str, default: u16, min: u16, max: u16) -> u16 {
    match env_var(name).and_then(|v| v.parse::<u16>().ok()) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

fn env_parse_i64(name: &str, default: i64, min: i64, max: i64) -> i64 {
    match env_var(name).and_then(|v| v.parse::<i64>().ok()) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

fn env_parse_bool(name: &str, default: bool) -> bool {
    match env_var(name) {
        Some(value) => {
            let normalized = value.to_ascii_lowercase();
            match normalized.as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => default,
            }
        }
        None => default,
    }
}

/// Parse a comma-separated threshold ladder into a sorted, deduplicated list.
///
/// Values outside `1..=100` are dropped. Returns `None` when nothing usable remains.
pub fn parse_thresholds(raw: &str) -> Option<Vec<u32>> {
    let mut thresholds: Vec<u32> = raw
        .split(',')
        .filter_map(|t| t.trim().parse::<u32>().ok())
        .filter(|t| (1..=100).contains(t))
        .collect();
    thresholds.sort_unstable();
    thresholds.dedup();
    (!thresholds.is_empty()).then_some(thresholds)
}

/// Default data directory: `<data dir>/validator-sentinel`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("validator-sentinel")
}

/// Runtime settings (env-driven).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelSettings {
    pub chain_api_url: String,
    pub ss58_prefix: u16,
    #[serde(skip_serializing)]
    pub discord_token: Option<String>,
    pub discord_channel_id: Option<String>,
    /// Log alerts instead of posting them to Discord.
    pub dry_run: bool,
    pub data_dir: PathBuf,
    pub monitor_interval_secs: u64,
    pub cooldown_days: i64,
    pub inactivity_thresholds: Vec<u32>,
    pub inactivity_reset: InactivityResetPolicy,
    pub max_concurrent_fetches: usize,
    pub http_timeout_ms: u64,
}

impl Default for SentinelSettings {
    fn default() -> Self {
        Self::from_env()
    }
}

impl SentinelSettings {
    pub fn from_env() -> Self {
        let inactivity_thresholds = env_var("SENTINEL_INACTIVITY_THRESHOLDS")
            .and_then(|raw| parse_thresholds(&raw))
            .unwrap_or_else(|| DEFAULT_INACTIVITY_THRESHOLDS.to_vec());

        let inactivity_reset = env_var("SENTINEL_INACTIVITY_RESET")
            .and_then(|v| InactivityResetPolicy::parse(&v))
            .unwrap_or_default();

        Self {
            chain_api_url: env_var("SENTINEL_CHAIN_API_URL")
                .unwrap_or_else(|| DEFAULT_CHAIN_API_URL.to_string()),
            ss58_prefix: env_parse_u16("CHAIN_SS58_PREFIX", DEFAULT_SS58_PREFIX, 0, 16_383),
            discord_token: env_var("DISCORD_TOKEN"),
            discord_channel_id: env_var("DISCORD_CHANNEL_ID"),
            dry_run: env_parse_bool("SENTINEL_DRY_RUN", false),
            data_dir: env_var("SENTINEL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            monitor_interval_secs: env_parse_u64(
                "SENTINEL_MONITOR_INTERVAL",
                DEFAULT_MONITOR_INTERVAL,
                MIN_MONITOR_INTERVAL,
                MAX_MONITOR_INTERVAL,
            ),
            cooldown_days: env_parse_i64("COOLDOWN_DAYS", DEFAULT_COOLDOWN_DAYS, 0, 365),
            inactivity_thresholds,
            inactivity_reset,
            max_concurrent_fetches: env_parse_usize(
                "SENTINEL_MAX_CONCURRENT_FETCHES",
                MAX_CONCURRENT_FETCHES,
                1,
                256,
            ),
            http_timeout_ms: env_parse_u64(
                "SENTINEL_HTTP_TIMEOUT_MS",
                HTTP_TIMEOUT.as_millis() as u64,
                500,
                120_000,
            ),
        }
    }

    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = data_dir;
        self
    }

    pub fn with_chain_api_url(mut self, url: impl Into<String>) -> Self {
        self.chain_api_url = url.into();
        self
    }

    pub fn with_ss58_prefix(mut self, prefix: u16) -> Self {
        self.ss58_prefix = prefix;
        self
    }

    pub fn with_monitor_interval_secs(mut self, secs: u64) -> Self {
        self.monitor_interval_secs = secs.clamp(MIN_MONITOR_INTERVAL, MAX_MONITOR_INTERVAL);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_cooldown_days(mut self, days: i64) -> Self {
        self.cooldown_days = days.max(0);
        self
    }

    pub fn with_inactivity_reset(mut self, policy: InactivityResetPolicy) -> Self {
        self.inactivity_reset = policy;
        self
    }

    pub fn cooldown(&self) -> TimeDelta {
        TimeDelta::days(self.cooldown_days)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join(VALIDATORS_DB_FILE)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(SENTINEL_DB_FILE)
    }
}

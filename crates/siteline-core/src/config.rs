//! Sync configuration loaded from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

const ENV_BASE_URL: &str = "SITELINE_BASE_URL";
const ENV_ACCOUNT_ID: &str = "SITELINE_ACCOUNT_ID";
const ENV_SESSION_COOKIE: &str = "SITELINE_SESSION_COOKIE";
const ENV_DATA_DIR: &str = "SITELINE_DATA_DIR";
const ENV_SYNC_INTERVAL_SECS: &str = "SITELINE_SYNC_INTERVAL_SECS";
const ENV_SYNC_THROTTLE_SECS: &str = "SITELINE_SYNC_THROTTLE_SECS";
const ENV_MAX_RETRIES: &str = "SITELINE_MAX_RETRIES";
const ENV_IMAGE_RETENTION_DAYS: &str = "SITELINE_IMAGE_RETENTION_DAYS";
const ENV_REQUEST_TIMEOUT_SECS: &str = "SITELINE_REQUEST_TIMEOUT_SECS";
const ENV_UPLOAD_TIMEOUT_SECS: &str = "SITELINE_UPLOAD_TIMEOUT_SECS";

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_SYNC_THROTTLE: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RETRIES: i64 = 3;
pub const DEFAULT_IMAGE_RETENTION_DAYS: u32 = 7;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Server endpoint and sync tuning knobs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncSettings {
    /// API origin, no trailing slash.
    pub base_url: String,
    /// Account whose inspections this device mirrors.
    pub account_id: String,
    /// Pre-seeded session cookie value; session management happens
    /// elsewhere.
    pub session_cookie: Option<String>,
    /// Root for the database file and managed image directory.
    pub data_dir: Option<PathBuf>,
    /// Period between opportunistic background cycles.
    pub sync_interval: Duration,
    /// Minimum gap between automatic sync attempts.
    pub sync_throttle: Duration,
    /// Attempts before a queued operation is dropped.
    pub max_retries: i64,
    /// Days an uploaded image keeps its local copy.
    pub image_retention_days: u32,
    /// Timeout for ordinary API requests.
    pub request_timeout: Duration,
    /// Timeout for multipart photo uploads.
    pub upload_timeout: Duration,
}

impl SyncSettings {
    /// Build settings with every knob at its default.
    pub fn new(base_url: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account_id: account_id.into(),
            session_cookie: None,
            data_dir: None,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            sync_throttle: DEFAULT_SYNC_THROTTLE,
            max_retries: DEFAULT_MAX_RETRIES,
            image_retention_days: DEFAULT_IMAGE_RETENTION_DAYS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    /// Load settings from environment variables.
    ///
    /// Returns `Ok(None)` when no `SITELINE_*` variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }

    /// Health endpoint probed by the connectivity monitor.
    #[must_use]
    pub fn health_url(&self) -> String {
        format!("{}/api/health", self.base_url)
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<SyncSettings>> {
    let lookup = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let base_url = lookup(ENV_BASE_URL);
    let account_id = lookup(ENV_ACCOUNT_ID);
    let session_cookie = lookup(ENV_SESSION_COOKIE);
    let data_dir = lookup(ENV_DATA_DIR);

    let any_present = base_url.is_some()
        || account_id.is_some()
        || session_cookie.is_some()
        || data_dir.is_some();

    if !any_present {
        return Ok(None);
    }

    let mut missing = Vec::new();
    if base_url.is_none() {
        missing.push(ENV_BASE_URL);
    }
    if account_id.is_none() {
        missing.push(ENV_ACCOUNT_ID);
    }
    if !missing.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Sync configuration is incomplete. Missing: {}",
            missing.join(", ")
        )));
    }

    let base_url = normalize_base_url(base_url)?;

    let mut settings = SyncSettings::new(base_url, account_id.unwrap_or_default());
    settings.session_cookie = session_cookie;
    settings.data_dir = data_dir.map(PathBuf::from);
    settings.sync_interval = parse_seconds(&lookup, ENV_SYNC_INTERVAL_SECS, DEFAULT_SYNC_INTERVAL)?;
    settings.sync_throttle = parse_seconds(&lookup, ENV_SYNC_THROTTLE_SECS, DEFAULT_SYNC_THROTTLE)?;
    settings.max_retries = parse_number(&lookup, ENV_MAX_RETRIES, DEFAULT_MAX_RETRIES)?;
    settings.image_retention_days = parse_number(
        &lookup,
        ENV_IMAGE_RETENTION_DAYS,
        i64::from(DEFAULT_IMAGE_RETENTION_DAYS),
    )?
    .try_into()
    .map_err(|_| Error::Config(format!("{ENV_IMAGE_RETENTION_DAYS} must not be negative")))?;
    settings.request_timeout =
        parse_seconds(&lookup, ENV_REQUEST_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT)?;
    settings.upload_timeout =
        parse_seconds(&lookup, ENV_UPLOAD_TIMEOUT_SECS, DEFAULT_UPLOAD_TIMEOUT)?;

    Ok(Some(settings))
}

fn normalize_base_url(base_url: Option<String>) -> Result<String> {
    let value = base_url.unwrap_or_default();
    if !value.starts_with("https://") && !value.starts_with("http://") {
        return Err(Error::Config(format!(
            "{ENV_BASE_URL} must start with http:// or https://"
        )));
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn parse_seconds(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| Error::Config(format!("{key} must be a whole number of seconds"))),
    }
}

fn parse_number(lookup: impl Fn(&str) -> Option<String>, key: &str, default: i64) -> Result<i64> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| Error::Config(format!("{key} must be a whole number"))),
    }
}

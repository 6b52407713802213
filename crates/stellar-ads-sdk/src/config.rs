//! Host configuration for the delivery runtime.
//!
//! The host page supplies a configuration object (the JSON form of
//! `window.StellarAdsConfig`) with the recognized options `siteId`, `tags`,
//! `containerId`, `size`, `debug`, `autoRefresh`, and `refreshInterval`.
//! Runtime tunables (`apiBaseUrl`, `timeoutMs`, `retryAttempts`,
//! `noticeDurationMs`, `discardStaleResponses`) share the same object.
//! Deployment environments may override a subset via environment variables.

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use stellar_ads_types::{AdSize, SiteId, SlotId};

use crate::error::ConfigError;

/// Backend used when the host page is served from a development origin.
pub const LOCAL_API_BASE_URL: &str = "http://localhost:3000";

/// Production ad backend.
pub const HOSTED_API_BASE_URL: &str = "https://ads-api.stellarads.com";

/// Development server port treated as a local origin.
const DEV_SERVER_PORT: u16 = 5500;

/// Default per-attempt network timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 8000;

/// Default cap on ad fetch attempts.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default auto-refresh interval in minutes.
pub const DEFAULT_REFRESH_INTERVAL_MINUTES: u64 = 5;

/// How long a reward notice stays on screen by default.
pub const DEFAULT_NOTICE_DURATION_MS: u64 = 4000;

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkConfig {
    /// Site identifier for the configured container.
    #[serde(default)]
    pub site_id: Option<SiteId>,
    /// Targeting keywords for the configured container.
    ///
    /// Accepts either a JSON array or a comma-separated string.
    #[serde(default, deserialize_with = "tags_from_list_or_csv")]
    pub tags: Vec<String>,
    /// Container element that qualifies as a slot even without a
    /// `data-site-id` marker.
    #[serde(default)]
    pub container_id: Option<SlotId>,
    /// Default slot size keyword for containers that declare none.
    #[serde(default)]
    pub size: Option<String>,
    /// Verbose logging.
    #[serde(default)]
    pub debug: bool,
    /// Start the refresh scheduler after the first delivery cycle.
    #[serde(default)]
    pub auto_refresh: bool,
    /// Minutes between automatic refresh cycles.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    /// Ad backend base URL. Detected from the page origin when absent.
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Per-attempt network timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum number of ad fetch attempts per delivery cycle.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// How long reward notices stay visible, in milliseconds.
    #[serde(default = "default_notice_duration_ms")]
    pub notice_duration_ms: u64,
    /// Drop completions older than the last applied one for the same slot
    /// instead of letting the last writer win.
    #[serde(default)]
    pub discard_stale_responses: bool,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            site_id: None,
            tags: Vec::new(),
            container_id: None,
            size: None,
            debug: false,
            auto_refresh: false,
            refresh_interval: DEFAULT_REFRESH_INTERVAL_MINUTES,
            api_base_url: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            notice_duration_ms: DEFAULT_NOTICE_DURATION_MS,
            discard_stale_responses: false,
        }
    }
}

impl SdkConfig {
    /// Parse the host configuration object.
    ///
    /// Unknown keys are ignored so hosts can share one object with other
    /// scripts.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply environment overrides:
    /// - `STELLAR_ADS_API_URL` -- backend base URL
    /// - `STELLAR_ADS_TIMEOUT_MS` -- per-attempt timeout
    /// - `STELLAR_ADS_RETRY_ATTEMPTS` -- fetch attempt cap
    /// - `STELLAR_ADS_DEBUG` -- verbose logging (`true`/`false`)
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("STELLAR_ADS_API_URL") {
            self.api_base_url = Some(url);
        }
        if let Some(raw) = lookup("STELLAR_ADS_TIMEOUT_MS") {
            self.timeout_ms = raw.trim().parse().map_err(|e| {
                ConfigError::Invalid(format!("invalid STELLAR_ADS_TIMEOUT_MS: {e}"))
            })?;
        }
        if let Some(raw) = lookup("STELLAR_ADS_RETRY_ATTEMPTS") {
            self.retry_attempts = raw.trim().parse().map_err(|e| {
                ConfigError::Invalid(format!("invalid STELLAR_ADS_RETRY_ATTEMPTS: {e}"))
            })?;
        }
        if let Some(raw) = lookup("STELLAR_ADS_DEBUG") {
            self.debug = raw.trim().parse().map_err(|e| {
                ConfigError::Invalid(format!("invalid STELLAR_ADS_DEBUG: {e}"))
            })?;
        }
        Ok(())
    }

    /// Reject values the runtime cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retryAttempts must be at least 1".to_owned(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeoutMs must be at least 1".to_owned()));
        }
        if self.refresh_interval == 0 {
            return Err(ConfigError::Invalid(
                "refreshInterval must be at least 1 minute".to_owned(),
            ));
        }
        if let Some(url) = &self.api_base_url {
            check_base_url(url)?;
        }
        Ok(())
    }

    /// Size used when a container declares none.
    pub fn default_size(&self) -> AdSize {
        self.size
            .as_deref()
            .and_then(AdSize::parse)
            .unwrap_or_default()
    }

    /// Per-attempt network timeout.
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reward notice display time.
    pub const fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.notice_duration_ms)
    }

    /// Backend base URL: the configured one, or one detected from the
    /// page origin, without a trailing slash.
    pub fn resolve_api_base_url(&self, page_origin: Option<&str>) -> String {
        let url = self.api_base_url.clone().unwrap_or_else(|| {
            page_origin.map_or_else(|| HOSTED_API_BASE_URL.to_owned(), detect_api_base_url)
        });
        url.trim_end_matches('/').to_owned()
    }
}

/// Pick the backend for a page origin.
///
/// Pages served from `localhost`, `127.0.0.1`, or the development server
/// port talk to the local backend; everything else uses the hosted one.
pub fn detect_api_base_url(page_origin: &str) -> String {
    let local = reqwest::Url::parse(page_origin).is_ok_and(|url| {
        matches!(url.host_str(), Some("localhost" | "127.0.0.1"))
            || url.port() == Some(DEV_SERVER_PORT)
    });
    if local {
        LOCAL_API_BASE_URL.to_owned()
    } else {
        HOSTED_API_BASE_URL.to_owned()
    }
}

/// Ensure a base URL parses and uses an HTTP scheme.
fn check_base_url(url: &str) -> Result<(), ConfigError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ConfigError::Invalid(format!("invalid apiBaseUrl {url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid(format!(
            "apiBaseUrl must use http or https, got {other}"
        ))),
    }
}

/// Split a comma-separated keyword list, trimming each entry and dropping
/// blanks. Order and duplicates are preserved.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

const fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MINUTES
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

const fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

const fn default_notice_duration_ms() -> u64 {
    DEFAULT_NOTICE_DURATION_MS
}

fn tags_from_list_or_csv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match Option::<Tags>::deserialize(deserializer)? {
        Some(Tags::List(list)) => list
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
        Some(Tags::Csv(raw)) => parse_tag_list(&raw),
        None => Vec::new(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_runtime_constants() {
        let config = SdkConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(8000));
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.refresh_interval, 5);
        assert_eq!(config.default_size(), AdSize::Medium);
        assert!(!config.auto_refresh);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_host_object() {
        let config = SdkConfig::from_json(
            r#"{
                "siteId": "abc",
                "tags": ["tech", " rust "],
                "containerId": "my-slot",
                "size": "large",
                "debug": true,
                "autoRefresh": true,
                "refreshInterval": 2,
                "somethingElse": 1
            }"#,
        );
        let config = config.unwrap();
        assert_eq!(config.site_id, Some(SiteId::from("abc")));
        assert_eq!(config.tags, vec!["tech".to_owned(), "rust".to_owned()]);
        assert_eq!(config.container_id, Some(SlotId::from("my-slot")));
        assert_eq!(config.default_size(), AdSize::Large);
        assert!(config.debug);
        assert!(config.auto_refresh);
        assert_eq!(config.refresh_interval, 2);
    }

    #[test]
    fn tags_accept_csv_string() {
        let config = SdkConfig::from_json(r#"{"tags": "a, b,,a"}"#).unwrap();
        assert_eq!(config.tags, vec!["a".to_owned(), "b".to_owned(), "a".to_owned()]);
    }

    #[test]
    fn unknown_size_falls_back_to_medium() {
        let config = SdkConfig::from_json(r#"{"size": "gigantic"}"#).unwrap();
        assert_eq!(config.default_size(), AdSize::Medium);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = SdkConfig::default();
        let result = config.apply_overrides(|name| match name {
            "STELLAR_ADS_API_URL" => Some("http://127.0.0.1:9999".to_owned()),
            "STELLAR_ADS_TIMEOUT_MS" => Some("250".to_owned()),
            "STELLAR_ADS_RETRY_ATTEMPTS" => Some("5".to_owned()),
            _ => None,
        });
        assert!(result.is_ok());
        assert_eq!(config.api_base_url.as_deref(), Some("http://127.0.0.1:9999"));
        assert_eq!(config.timeout_ms, 250);
        assert_eq!(config.retry_attempts, 5);
    }

    #[test]
    fn bad_override_is_rejected() {
        let mut config = SdkConfig::default();
        let result = config.apply_overrides(|name| {
            (name == "STELLAR_ADS_RETRY_ATTEMPTS").then(|| "many".to_owned())
        });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validation_rejects_unusable_values() {
        let zero_attempts = SdkConfig {
            retry_attempts: 0,
            ..SdkConfig::default()
        };
        assert!(zero_attempts.validate().is_err());

        let bad_scheme = SdkConfig {
            api_base_url: Some("ftp://ads.example".to_owned()),
            ..SdkConfig::default()
        };
        assert!(bad_scheme.validate().is_err());

        let zero_interval = SdkConfig {
            refresh_interval: 0,
            ..SdkConfig::default()
        };
        assert!(zero_interval.validate().is_err());
    }

    #[test]
    fn api_base_url_detection() {
        assert_eq!(detect_api_base_url("http://localhost:8080"), LOCAL_API_BASE_URL);
        assert_eq!(detect_api_base_url("http://127.0.0.1"), LOCAL_API_BASE_URL);
        assert_eq!(detect_api_base_url("http://192.168.0.4:5500"), LOCAL_API_BASE_URL);
        assert_eq!(detect_api_base_url("https://blog.example.com"), HOSTED_API_BASE_URL);
        assert_eq!(detect_api_base_url("not a url"), HOSTED_API_BASE_URL);
    }

    #[test]
    fn configured_base_url_wins_and_is_trimmed() {
        let config = SdkConfig {
            api_base_url: Some("http://127.0.0.1:4000/".to_owned()),
            ..SdkConfig::default()
        };
        assert_eq!(
            config.resolve_api_base_url(Some("https://blog.example.com")),
            "http://127.0.0.1:4000"
        );
        assert_eq!(
            SdkConfig::default().resolve_api_base_url(None),
            HOSTED_API_BASE_URL
        );
    }
}

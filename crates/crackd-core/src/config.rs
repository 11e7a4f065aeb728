//! Configuration module
//!
//! Endpoints, timings and matching rules for the upload pipeline, the vote endpoint and
//! the feed source. Values come from the environment (and a `.env` file when present).

use std::env;
use std::time::Duration;

// Common constants
const DEFAULT_PIPELINE_URL: &str = "https://api.almostcrackd.ai";
const DEFAULT_APP_URL: &str = "http://localhost:3000";
const HTTP_TIMEOUT_SECS: u64 = 60;
const ADVANCE_DELAY_MS: u64 = 350;
const ERROR_CLEAR_MS: u64 = 1500;
const DEFAULT_CONFLICT_MARKERS: &str = "duplicate,unique";
const DEFAULT_CONTENT_TYPES: &str =
    "image/jpeg,image/jpg,image/png,image/webp,image/gif,image/heic";

/// Substrings that identify a uniqueness-constraint violation in a vote rejection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictMarkers(Vec<String>);

impl ConflictMarkers {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            markers
                .into_iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        )
    }

    /// Case-insensitive substring match against any marker.
    pub fn matches(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.0.iter().any(|marker| message.contains(marker.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Default for ConflictMarkers {
    fn default() -> Self {
        Self::new(DEFAULT_CONFLICT_MARKERS.split(','))
    }
}

/// Settings for the upload controller.
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub allowed_content_types: Vec<String>,
}

impl UploadConfig {
    /// Whether a declared MIME type (parameters ignored) is accepted for upload.
    pub fn accepts(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        self.allowed_content_types.iter().any(|t| *t == essence)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_content_types: split_list(DEFAULT_CONTENT_TYPES),
        }
    }
}

/// Settings for the feed engine.
#[derive(Clone, Debug)]
pub struct FeedConfig {
    /// Delay between an accepted decide/skip and the cursor advance. Zero advances
    /// immediately.
    pub advance_delay: Duration,
    /// How long a transient vote error stays visible.
    pub error_clear_delay: Duration,
    pub conflict_markers: ConflictMarkers,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            advance_delay: Duration::from_millis(ADVANCE_DELAY_MS),
            error_clear_delay: Duration::from_millis(ERROR_CLEAR_MS),
            conflict_markers: ConflictMarkers::default(),
        }
    }
}

/// Full client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub pipeline_url: String,
    pub app_url: String,
    pub feed_url: Option<String>,
    pub feed_api_key: Option<String>,
    pub access_token: Option<String>,
    pub http_timeout: Duration,
    pub upload: UploadConfig,
    pub feed: FeedConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pipeline_url: DEFAULT_PIPELINE_URL.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            feed_url: None,
            feed_api_key: None,
            access_token: None,
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            upload: UploadConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from an arbitrary key lookup. Unset or unparsable numeric
    /// values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let millis = |key: &str, default: u64| {
            non_empty(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(default))
        };

        let http_timeout = non_empty("CRACKD_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(HTTP_TIMEOUT_SECS);

        let conflict_markers = non_empty("CRACKD_CONFLICT_MARKERS")
            .map(|v| ConflictMarkers::new(v.split(',')))
            .unwrap_or_default();

        let allowed_content_types = non_empty("CRACKD_ALLOWED_CONTENT_TYPES")
            .map(|v| split_list(&v))
            .unwrap_or_else(|| split_list(DEFAULT_CONTENT_TYPES));

        Self {
            pipeline_url: non_empty("CRACKD_PIPELINE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_PIPELINE_URL.to_string()),
            app_url: non_empty("CRACKD_APP_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_APP_URL.to_string()),
            feed_url: non_empty("CRACKD_FEED_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string()),
            feed_api_key: non_empty("CRACKD_FEED_API_KEY"),
            access_token: non_empty("CRACKD_ACCESS_TOKEN"),
            http_timeout: Duration::from_secs(http_timeout),
            upload: UploadConfig {
                allowed_content_types,
            },
            feed: FeedConfig {
                advance_delay: millis("CRACKD_ADVANCE_DELAY_MS", ADVANCE_DELAY_MS),
                error_clear_delay: millis("CRACKD_ERROR_CLEAR_MS", ERROR_CLEAR_MS),
                conflict_markers,
            },
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        check_url("CRACKD_PIPELINE_URL", &self.pipeline_url)?;
        check_url("CRACKD_APP_URL", &self.app_url)?;
        if let Some(feed_url) = &self.feed_url {
            check_url("CRACKD_FEED_URL", feed_url)?;
        }
        if self.feed.conflict_markers.is_empty() {
            return Err(anyhow::anyhow!(
                "CRACKD_CONFLICT_MARKERS must contain at least one marker"
            ));
        }
        if self.upload.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "CRACKD_ALLOWED_CONTENT_TYPES must contain at least one type"
            ));
        }
        if self.http_timeout.is_zero() {
            return Err(anyhow::anyhow!("CRACKD_HTTP_TIMEOUT_SECS must be positive"));
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn check_url(name: &str, value: &str) -> Result<(), anyhow::Error> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} must be an http(s) URL, got '{}'",
            name,
            value
        ))
    }
}

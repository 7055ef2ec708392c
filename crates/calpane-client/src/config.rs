//! Client configuration.
//!
//! All settings live in `~/.config/calpane/config.toml` by default:
//!
//! ```toml
//! debug = false
//!
//! [google]
//! access_token = "env::CALPANE_GOOGLE_TOKEN"
//! calendar_ids = ["me@example.com"]
//!
//! [sync]
//! fetch_timeout_secs = 30
//! notice_clear_secs = 3
//! retry_attempts = 1
//! desktop_notifications = false
//!
//! [display]
//! week_start = "monday"
//! ```
//!
//! `access_token` supports secret references (see [`crate::secret`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use calpane_sync::{CoordinatorConfig, FailurePolicy};
use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Configuration for the calpane client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google Calendar settings.
    #[cfg(feature = "google")]
    pub google: Option<GoogleSettings>,

    /// Debug mode.
    pub debug: bool,

    /// Fetch and notice settings.
    pub sync: SyncSettings,

    /// Display settings.
    pub display: DisplaySettings,
}

/// Fetch coordination settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Upper bound for one calendar fetch.
    pub fetch_timeout_secs: u64,

    /// How long error banners stay up.
    pub notice_clear_secs: u64,

    /// Attempts per calendar and run; 1 disables retries.
    pub retry_attempts: u32,

    /// Forward error notices to the desktop notification daemon.
    pub desktop_notifications: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            notice_clear_secs: 3,
            retry_attempts: 1,
            desktop_notifications: false,
        }
    }
}

impl SyncSettings {
    /// Builds the coordinator configuration.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        let policy = if self.retry_attempts > 1 {
            FailurePolicy::retry(self.retry_attempts)
        } else {
            FailurePolicy::Advance
        };

        CoordinatorConfig::default()
            .with_fetch_timeout(Duration::from_secs(self.fetch_timeout_secs.max(1)))
            .with_notice_clear_delay(Duration::from_secs(self.notice_clear_secs))
            .with_failure_policy(policy)
    }
}

/// Display settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// First day of the week for week and month views.
    pub week_start: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            week_start: "monday".to_string(),
        }
    }
}

impl DisplaySettings {
    /// Parses `week_start`.
    pub fn week_start(&self) -> Result<Weekday, String> {
        self.week_start
            .parse::<Weekday>()
            .map_err(|_| format!("invalid week_start: {}", self.week_start))
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calpane")
    }

    /// Checks every value that can be checked without network access.
    pub fn validate(&self) -> Result<(), String> {
        self.display.week_start()?;
        if self.sync.fetch_timeout_secs == 0 {
            return Err("sync.fetch_timeout_secs must be positive".to_string());
        }
        #[cfg(feature = "google")]
        if let Some(ref google) = self.google {
            google.to_provider_config()?;
        }
        Ok(())
    }
}

/// Google Calendar settings.
#[cfg(feature = "google")]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth access token (supports `pass::` and `env::` prefixes).
    pub access_token: Option<String>,

    /// Calendars to show; empty means every calendar in the list.
    pub calendar_ids: Vec<String>,

    /// API root override.
    pub base_url: Option<String>,
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Resolves the token and builds the source configuration.
    pub fn to_provider_config(&self) -> Result<calpane_providers::google::GoogleConfig, String> {
        use calpane_providers::google::GoogleConfig;

        let token = self.resolve_access_token()?;
        let mut config = GoogleConfig::new(token);
        if let Some(ref base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }
        config.validate()?;
        Ok(config)
    }

    /// Returns the access token with secret references expanded.
    pub(crate) fn resolve_access_token(&self) -> Result<String, String> {
        let raw = self.access_token.as_deref().ok_or_else(|| {
            format!(
                "Google access token not found. Add to {}:\n  \
                 [google]\n  \
                 access_token = \"env::CALPANE_GOOGLE_TOKEN\"",
                ClientConfig::default_path().display()
            )
        })?;

        crate::secret::resolve(raw).map_err(|e| format!("failed to resolve access_token: {}", e))
    }

    /// Returns true if `calendar_id` should be shown.
    pub fn wants(&self, calendar_id: &str) -> bool {
        self.calendar_ids.is_empty() || self.calendar_ids.iter().any(|id| id == calendar_id)
    }
}

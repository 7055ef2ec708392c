//! Google Calendar source configuration.

use std::time::Duration;

/// Configuration for [`GoogleCalendarClient`](super::GoogleCalendarClient).
///
/// The access token is obtained elsewhere; this crate never runs an OAuth
/// flow.
#[derive(Clone)]
pub struct GoogleConfig {
    /// Bearer token sent with every request.
    pub access_token: String,
    /// API root, overridable for proxies and test servers.
    pub base_url: String,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
    /// Page size requested from the events endpoint.
    pub page_size: u32,
    /// User agent string for API requests.
    pub user_agent: String,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("access_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("page_size", &self.page_size)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl GoogleConfig {
    /// Default API root.
    pub const DEFAULT_BASE_URL: &'static str = "https://www.googleapis.com/calendar/v3";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Largest page size the events endpoint accepts.
    pub const MAX_PAGE_SIZE: u32 = 2500;

    /// Creates a configuration with the given access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            page_size: 250,
            user_agent: format!("calpane/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.access_token.trim().is_empty() {
            return Err("access token is required".to_string());
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(format!("invalid base url: {}", self.base_url));
        }
        if self.page_size == 0 || self.page_size > Self::MAX_PAGE_SIZE {
            return Err(format!(
                "page size must be between 1 and {}",
                Self::MAX_PAGE_SIZE
            ));
        }
        Ok(())
    }
}

//! CLI configuration.
//!
//! Provides the validated settings the commands run with.

use std::fmt;
use std::time::Duration;

use gavel_sdk::client::config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use gavel_sdk::ws::config::DEFAULT_HUB_URL;
use gavel_sdk::{ClientConfig, HubConfig};
use serde::{Deserialize, Serialize};

/// Configuration for the CLI.
#[derive(Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// REST API base URL.
    pub api_url: String,

    /// Auction hub URL.
    pub hub_url: String,

    /// Bearer token for authenticated calls.
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Re-fetch the auction after the live channel rejoins.
    pub resync_on_reconnect: bool,
}

impl fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliConfig")
            .field("api_url", &self.api_url)
            .field("hub_url", &self.hub_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("resync_on_reconnect", &self.resync_on_reconnect)
            .finish()
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            hub_url: DEFAULT_HUB_URL.to_string(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            resync_on_reconnect: true,
        }
    }
}

impl CliConfig {
    /// Sets the API and hub URLs.
    #[must_use]
    pub fn with_urls(mut self, api_url: impl Into<String>, hub_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self.hub_url = hub_url.into();
        self
    }

    /// Sets the access token. Blank tokens are ignored.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|token| !token.trim().is_empty());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Enables or disables resync after reconnect.
    #[must_use]
    pub fn with_resync_on_reconnect(mut self, enabled: bool) -> Self {
        self.resync_on_reconnect = enabled;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_http_url(&self.api_url) {
            return Err(ConfigError::InvalidApiUrl(self.api_url.clone()));
        }

        if !is_http_url(&self.hub_url)
            && !self.hub_url.starts_with("ws://")
            && !self.hub_url.starts_with("wss://")
        {
            return Err(ConfigError::InvalidHubUrl(self.hub_url.clone()));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }

    /// REST client settings.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }

    /// Hub settings.
    #[must_use]
    pub fn hub_config(&self) -> HubConfig {
        HubConfig::new(self.hub_url.clone()).with_resync_on_reconnect(self.resync_on_reconnect)
    }
}

fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));
    rest.is_some_and(|host| !host.is_empty())
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid API URL.
    #[error("GAVEL_API_URL must be an http(s) URL, got {0:?}")]
    InvalidApiUrl(String),

    /// Invalid hub URL.
    #[error("GAVEL_HUB_URL must be an http(s) or ws(s) URL, got {0:?}")]
    InvalidHubUrl(String),

    /// Invalid timeout.
    #[error("timeout must be > 0")]
    InvalidTimeout,
}

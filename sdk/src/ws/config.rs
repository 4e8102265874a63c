//! Hub configuration.
//!
//! Provides configuration options for the live bid channel.

use std::time::Duration;

/// Default hub URL.
pub const DEFAULT_HUB_URL: &str = "ws://localhost:5000/auctionHub";

/// Hub method that joins an auction's broadcast group.
pub const DEFAULT_JOIN_METHOD: &str = "JoinAuctionRoom";

/// Hub message carrying a new bid.
pub const DEFAULT_BID_EVENT: &str = "NewBidPlaced";

/// Hub message announcing the end of an auction.
pub const DEFAULT_ENDED_EVENT: &str = "AuctionEnded";

/// Default keepalive ping interval in seconds.
pub const DEFAULT_KEEPALIVE_SECS: u64 = 15;

/// Default server silence tolerated before the connection counts as lost.
pub const DEFAULT_SERVER_TIMEOUT_SECS: u64 = 30;

/// Default time allowed for connect plus join acknowledgement.
pub const DEFAULT_JOIN_TIMEOUT_SECS: u64 = 15;

/// Default reconnect schedule in seconds; one attempt per entry.
pub const DEFAULT_RECONNECT_DELAYS_SECS: [u64; 4] = [0, 2, 10, 30];

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Hub URL (`ws`, `wss`, `http` or `https`).
    pub url: String,

    /// Join method name.
    pub join_method: String,

    /// Bid message name.
    pub bid_event: String,

    /// Auction-ended message name.
    pub ended_event: String,

    /// Keepalive ping interval.
    pub keepalive_interval: Duration,

    /// Server silence tolerated before reconnecting.
    pub server_timeout: Duration,

    /// Deadline for the connect-and-join sequence.
    pub join_timeout: Duration,

    /// Delay before each reconnect attempt. Empty disables reconnection.
    pub reconnect_delays: Vec<Duration>,

    /// Re-fetch the auction after every successful rejoin.
    pub resync_on_reconnect: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_HUB_URL.to_string(),
            join_method: DEFAULT_JOIN_METHOD.to_string(),
            bid_event: DEFAULT_BID_EVENT.to_string(),
            ended_event: DEFAULT_ENDED_EVENT.to_string(),
            keepalive_interval: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            server_timeout: Duration::from_secs(DEFAULT_SERVER_TIMEOUT_SECS),
            join_timeout: Duration::from_secs(DEFAULT_JOIN_TIMEOUT_SECS),
            reconnect_delays: DEFAULT_RECONNECT_DELAYS_SECS
                .iter()
                .map(|secs| Duration::from_secs(*secs))
                .collect(),
            resync_on_reconnect: true,
        }
    }
}

impl HubConfig {
    /// Creates a new configuration with the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the keepalive interval.
    #[must_use]
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Sets the server timeout.
    #[must_use]
    pub fn with_server_timeout(mut self, timeout: Duration) -> Self {
        self.server_timeout = timeout;
        self
    }

    /// Sets the join timeout.
    #[must_use]
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Sets the reconnect schedule.
    #[must_use]
    pub fn with_reconnect_delays(mut self, delays: Vec<Duration>) -> Self {
        self.reconnect_delays = delays;
        self
    }

    /// Enables or disables resynchronization after a rejoin.
    #[must_use]
    pub fn with_resync_on_reconnect(mut self, enabled: bool) -> Self {
        self.resync_on_reconnect = enabled;
        self
    }

    /// Returns the WebSocket URL, with the access token if one is given.
    #[must_use]
    pub fn connection_url(&self, access_token: Option<&str>) -> String {
        let url = if let Some(rest) = self.url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.url.clone()
        };

        match access_token {
            Some(token) => {
                let separator = if url.contains('?') { '&' } else { '?' };
                format!("{}{}access_token={}", url, separator, token)
            }
            None => url,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), super::error::HubError> {
        use super::error::HubError;

        if self.url.is_empty() {
            return Err(HubError::InvalidConfig("url cannot be empty".to_string()));
        }

        if !["ws://", "wss://", "http://", "https://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
        {
            return Err(HubError::InvalidConfig(
                "url must start with ws://, wss://, http:// or https://".to_string(),
            ));
        }

        if self.join_method.is_empty() || self.bid_event.is_empty() {
            return Err(HubError::InvalidConfig(
                "join method and bid event names cannot be empty".to_string(),
            ));
        }

        if self.keepalive_interval.is_zero() {
            return Err(HubError::InvalidConfig(
                "keepalive_interval must be > 0".to_string(),
            ));
        }

        if self.server_timeout <= self.keepalive_interval {
            return Err(HubError::InvalidConfig(
                "server_timeout must exceed keepalive_interval".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = HubConfig::default();
        assert_eq!(config.url, DEFAULT_HUB_URL);
        assert_eq!(config.join_method, "JoinAuctionRoom");
        assert_eq!(config.bid_event, "NewBidPlaced");
        assert_eq!(config.reconnect_delays.len(), 4);
        assert_eq!(config.reconnect_delays[1], Duration::from_secs(2));
        assert!(config.resync_on_reconnect);
    }

    #[test]
    fn test_config_builder() {
        let config = HubConfig::new("wss://example.com/hub")
            .with_keepalive_interval(Duration::from_secs(5))
            .with_server_timeout(Duration::from_secs(12))
            .with_join_timeout(Duration::from_secs(3))
            .with_reconnect_delays(vec![Duration::ZERO])
            .with_resync_on_reconnect(false);

        assert_eq!(config.keepalive_interval, Duration::from_secs(5));
        assert_eq!(config.server_timeout, Duration::from_secs(12));
        assert_eq!(config.join_timeout, Duration::from_secs(3));
        assert_eq!(config.reconnect_delays, vec![Duration::ZERO]);
        assert!(!config.resync_on_reconnect);
    }

    #[test]
    fn test_connection_url_scheme_mapping() {
        assert_eq!(
            HubConfig::new("https://example.com/hub").connection_url(None),
            "wss://example.com/hub"
        );
        assert_eq!(
            HubConfig::new("http://localhost:5000/hub").connection_url(None),
            "ws://localhost:5000/hub"
        );
        assert_eq!(
            HubConfig::new("wss://example.com/hub").connection_url(None),
            "wss://example.com/hub"
        );
    }

    #[test]
    fn test_connection_url_with_token() {
        let config = HubConfig::new("wss://example.com/hub");
        assert_eq!(
            config.connection_url(Some("abc")),
            "wss://example.com/hub?access_token=abc"
        );

        let config = HubConfig::new("wss://example.com/hub?v=1");
        assert_eq!(
            config.connection_url(Some("abc")),
            "wss://example.com/hub?v=1&access_token=abc"
        );
    }

    #[test]
    fn test_config_validate() {
        assert!(HubConfig::default().validate().is_ok());
        assert!(HubConfig::new("").validate().is_err());
        assert!(HubConfig::new("ftp://example.com").validate().is_err());

        let config = HubConfig::default().with_server_timeout(Duration::from_secs(1));
        assert!(config.validate().is_err());
    }
}

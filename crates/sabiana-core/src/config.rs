// ── Runtime coordinator configuration ──
//
// Describes how to reach the cloud and how often to poll. Carries the
// API key but never touches disk: the CLI builds a `CoordinatorConfig`
// from its profile and hands it in.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::CoreError;

pub const DEFAULT_BASE_URL: &str = "https://data.sabiana.cloud";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_TIMEOUT: Duration = sabiana_api::transport::DEFAULT_TIMEOUT;

/// Configuration for one Sabiana Cloud account.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// API root (e.g. `https://data.sabiana.cloud`).
    pub base_url: Url,
    pub api_key: SecretString,
    /// Time between background polls. Zero disables the background task.
    pub poll_interval: Duration,
    /// Per-request HTTP timeout. Also bounds each poll.
    pub timeout: Duration,
    /// Drop unconfirmed writes after this long. `None` keeps them until
    /// the server confirms.
    pub pending_ttl: Option<Duration>,
    /// Added to the local clock when stamping a pending write, to line it
    /// up with the server's `lastUpdate` clock.
    pub clock_offset_ms: i64,
}

impl CoordinatorConfig {
    /// Defaults for everything but the key.
    pub fn new(api_key: SecretString) -> Result<Self, CoreError> {
        let base_url = Url::parse(DEFAULT_BASE_URL).map_err(|e| CoreError::Config {
            message: format!("invalid default base URL: {e}"),
        })?;
        Ok(Self {
            base_url,
            api_key,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            pending_ttl: None,
            clock_offset_ms: 0,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(CoreError::Config {
                message: "API key must not be empty".into(),
            });
        }
        if self.timeout.is_zero() {
            return Err(CoreError::Config {
                message: "timeout must be greater than zero".into(),
            });
        }
        if self.pending_ttl == Some(Duration::ZERO) {
            return Err(CoreError::Config {
                message: "pending_ttl must be greater than zero when set".into(),
            });
        }
        if self.base_url.cannot_be_a_base() {
            return Err(CoreError::Config {
                message: format!("{} is not a usable base URL", self.base_url),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = CoordinatorConfig::new(SecretString::from("k".to_owned())).unwrap();
        assert_eq!(cfg.base_url.as_str(), "https://data.sabiana.cloud/");
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert_eq!(cfg.timeout, Duration::from_secs(15));
        assert!(cfg.pending_ttl.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_key_is_rejected() {
        let cfg = CoordinatorConfig::new(SecretString::from("  ".to_owned())).unwrap();
        assert!(matches!(cfg.validate(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn zero_pending_ttl_is_rejected() {
        let mut cfg = CoordinatorConfig::new(SecretString::from("k".to_owned())).unwrap();
        cfg.pending_ttl = Some(Duration::ZERO);
        assert!(matches!(cfg.validate(), Err(CoreError::Config { .. })));

        cfg.pending_ttl = Some(Duration::from_secs(1));
        assert!(cfg.validate().is_ok());
    }
}

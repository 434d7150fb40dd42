// ── Core error types ──
//
// User-facing errors from sabiana-core. Consumers never match on HTTP
// statuses directly: the `From<sabiana_api::Error>` impl folds transport
// failures into domain variants, and `kind()` recovers the coarse
// forbidden / not-found / transport split when a caller needs it.

use sabiana_api::ErrorKind;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Cannot reach Sabiana Cloud at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Coordinator has been shut down")]
    Shutdown,

    #[error("Transport error: {message}")]
    Transport { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Endpoint not found: {path}")]
    NotFound { path: String },

    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// The API error class this came from, if it came from the API.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::AuthenticationFailed { .. } => Some(ErrorKind::Forbidden),
            Self::NotFound { .. } => Some(ErrorKind::NotFound),
            Self::ConnectionFailed { .. }
            | Self::Timeout
            | Self::Transport { .. }
            | Self::Api { .. } => Some(ErrorKind::Transport),
            Self::DeviceNotFound { .. }
            | Self::Shutdown
            | Self::Validation { .. }
            | Self::Config { .. } => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sabiana_api::Error> for CoreError {
    fn from(err: sabiana_api::Error) -> Self {
        match err {
            sabiana_api::Error::Forbidden => CoreError::AuthenticationFailed {
                message: "API key rejected or rate limited (HTTP 403)".into(),
            },
            sabiana_api::Error::InvalidApiKey { message } => {
                CoreError::AuthenticationFailed { message }
            }
            sabiana_api::Error::NotFound { path } => CoreError::NotFound { path },
            sabiana_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Transport {
                        message: e.to_string(),
                    }
                }
            }
            sabiana_api::Error::Status { status, message } => CoreError::Api {
                message: format!("HTTP {status}: {message}"),
                status: Some(status),
            },
            sabiana_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            sabiana_api::Error::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("Unexpected response: {message}"),
                status: None,
            },
        }
    }
}

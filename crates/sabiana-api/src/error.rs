use thiserror::Error;

/// Top-level error type for the `sabiana-api` crate.
///
/// Every failure is reducible to one of three kinds (see [`ErrorKind`]):
/// forbidden, not found, or transport. `sabiana-core` maps these into
/// user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// HTTP 403. The cloud answers this both for a bad API key and when
    /// the account is rate limited; the two are indistinguishable.
    #[error("Forbidden (invalid API key or rate limit)")]
    Forbidden,

    /// The API key cannot be sent as an HTTP header value.
    #[error("Invalid API key: {message}")]
    InvalidApiKey { message: String },

    // ── Resources ───────────────────────────────────────────────────
    /// HTTP 404: unknown endpoint or unit address.
    #[error("Endpoint not found: {path}")]
    NotFound { path: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Any other non-2xx status.
    #[error("Unexpected HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// HTTP 403.
    Forbidden,
    /// HTTP 404.
    NotFound,
    /// Everything else: network failures, timeouts, other statuses,
    /// malformed payloads.
    Transport,
}

impl Error {
    /// Classify this error into the three-way taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden | Self::InvalidApiKey { .. } => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Transport(e) if e.status() == Some(reqwest::StatusCode::FORBIDDEN) => {
                ErrorKind::Forbidden
            }
            Self::Transport(e) if e.status() == Some(reqwest::StatusCode::NOT_FOUND) => {
                ErrorKind::NotFound
            }
            Self::Transport(_)
            | Self::Status { .. }
            | Self::InvalidUrl(_)
            | Self::Deserialization { .. } => ErrorKind::Transport,
        }
    }

    /// Returns `true` if the key was rejected (or the account throttled).
    pub fn is_forbidden(&self) -> bool {
        self.kind() == ErrorKind::Forbidden
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns `true` if the request hit the client timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next poll.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

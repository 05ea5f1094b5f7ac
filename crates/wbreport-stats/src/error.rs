use thiserror::Error;

use crate::endpoint::Endpoint;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected {found} payload from {endpoint}; expected an array or object")]
    UnexpectedShape {
        endpoint: Endpoint,
        found: &'static str,
    },

    /// A single 429 response. Retried; never surfaced unless the retry
    /// loop is bypassed.
    #[error("rate limited on {endpoint} (retry after {retry_after_secs:?}s)")]
    RateLimited {
        endpoint: Endpoint,
        retry_after_secs: Option<u64>,
    },

    #[error("rate limit still in effect on {endpoint} after {attempts} attempts")]
    RateLimitExceeded { endpoint: Endpoint, attempts: u32 },

    #[error("bad request to {endpoint}: {body}")]
    BadRequest { endpoint: Endpoint, body: String },

    #[error("credential rejected by {endpoint} (HTTP {status})")]
    Unauthorized { endpoint: Endpoint, status: u16 },

    #[error("server error {status} from {endpoint}")]
    ServerError { endpoint: Endpoint, status: u16 },

    #[error("unexpected HTTP status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: Endpoint, status: u16 },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

/// Coarse failure classes the caller maps to user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    Auth,
    BadRequest,
    Timeout,
    Other,
}

impl StatsError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            StatsError::RateLimited { .. } | StatsError::RateLimitExceeded { .. } => {
                FailureKind::RateLimited
            }
            StatsError::Unauthorized { .. } => FailureKind::Auth,
            StatsError::BadRequest { .. } => FailureKind::BadRequest,
            StatsError::Http(e) if e.is_timeout() || e.is_connect() => FailureKind::Timeout,
            _ => FailureKind::Other,
        }
    }
}

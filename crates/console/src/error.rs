//! Error taxonomy of the console client.

use thiserror::Error;

/// Outcome of a backend call that did not complete normally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The backend rejected the bearer credential (401/403). The session has
    /// already been invalidated and the expiry broadcast sent; the call is
    /// inconclusive and must not be retried automatically.
    #[error("credential expired or rejected")]
    AuthorizationExpired,

    /// Any other non-2xx response; `body` is left for the caller to interpret.
    #[error("request failed ({status}): {body}")]
    RequestFailed { status: u16, body: String },

    /// The request never produced an HTTP response (network unreachable, DNS, ...).
    #[error("transport failure: {0}")]
    Transport(String),

    /// A 2xx response whose body did not have the expected shape.
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the caller should treat the call as "did not conclude" rather
    /// than as a normal failure.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, Self::AuthorizationExpired)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The failure body parsed as JSON, when it is JSON.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::RequestFailed { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ApiError::Decode(error.to_string())
        } else {
            ApiError::Transport(error.to_string())
        }
    }
}

/// Persisted keyed-store failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid API url '{0}'")]
    InvalidApiUrl(String),

    #[error("could not resolve a directory for the session state file")]
    NoStateDir,
}

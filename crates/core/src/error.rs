//! Error types for the router core.
//!
//! Three layers, each with its own enum:
//! - [`ClientError`]: one hop to one upstream failed (transport, timeout, status, decoding).
//! - [`RouterError`]: what a router operation reports to its caller.
//! - [`ConfigError`]: startup configuration was rejected.

use api_shared::messages;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("invalid upstream url: {0}")]
    InvalidUrl(String),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("{url} answered with unexpected status {status}")]
    UnexpectedStatus { url: String, status: u16 },
    #[error("could not decode patient record from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl ClientError {
    /// Classifies a reqwest failure, keeping timeouts distinguishable from other transport faults.
    pub(crate) fn from_reqwest(url: &reqwest::Url, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ClientError::Timeout {
                url: url.to_string(),
            }
        } else {
            ClientError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }

    /// Returns the upstream status code when the failure was an unexpected answer.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Required identifying parameters are absent or blank.
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    /// Neither tier holds the record.
    #[error("patient not found")]
    NotFound,
    /// The central tier could not answer the lookup.
    #[error("central registry unavailable: {0}")]
    CentralUnavailable(#[source] ClientError),
    /// A pass-through target could not be reached.
    #[error("downstream service unavailable: {0}")]
    Downstream(#[source] ClientError),
}

impl RouterError {
    /// The fixed message shown to callers. Upstream detail stays in the logs.
    pub fn message(&self) -> &'static str {
        match self {
            RouterError::InvalidRequest(message) => *message,
            RouterError::NotFound => messages::PATIENT_NOT_FOUND,
            RouterError::CentralUnavailable(_) => messages::CENTRAL_UNAVAILABLE,
            RouterError::Downstream(_) => messages::DOWNSTREAM_UNAVAILABLE,
        }
    }
}

pub type RouterResult<T> = std::result::Result<T, RouterError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid base URL ({value}): {reason}")]
    InvalidBaseUrl {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("hop timeout must be greater than zero")]
    ZeroHopTimeout,
    #[error("{name} must be a whole number of seconds, got {value:?}")]
    InvalidSeconds { name: &'static str, value: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

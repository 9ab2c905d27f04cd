//! Router runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the router. Request
//! handling never reads process-wide environment variables.

use crate::constants::DEFAULT_HOP_TIMEOUT;
use crate::error::{ConfigError, ConfigResult};
use reqwest::Url;
use std::time::Duration;

/// Upstream locations and per-hop limits, resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouterConfig {
    central_base_url: Url,
    local_base_url: Url,
    peer_router_base_url: Option<Url>,
    billing_base_url: Url,
    consultation_base_url: Url,
    hop_timeout: Duration,
}

impl RouterConfig {
    /// Create a new `RouterConfig`.
    ///
    /// The consultation service defaults to the local site store, no peer router is used and
    /// every hop is bounded by [`DEFAULT_HOP_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if any URL does not parse or is not http(s).
    pub fn new(
        central_base_url: &str,
        local_base_url: &str,
        billing_base_url: &str,
    ) -> ConfigResult<Self> {
        let local = parse_base_url("local site URL", local_base_url)?;
        Ok(Self {
            central_base_url: parse_base_url("central registry URL", central_base_url)?,
            consultation_base_url: local.clone(),
            local_base_url: local,
            peer_router_base_url: None,
            billing_base_url: parse_base_url("billing URL", billing_base_url)?,
            hop_timeout: DEFAULT_HOP_TIMEOUT,
        })
    }

    /// Route the check-in central hop through a peer (central-tier) router.
    pub fn with_peer_router(mut self, peer_router_base_url: &str) -> ConfigResult<Self> {
        self.peer_router_base_url = Some(parse_base_url("peer router URL", peer_router_base_url)?);
        Ok(self)
    }

    pub fn with_consultation_service(mut self, consultation_base_url: &str) -> ConfigResult<Self> {
        self.consultation_base_url = parse_base_url("consultation URL", consultation_base_url)?;
        Ok(self)
    }

    pub fn with_hop_timeout(mut self, hop_timeout: Duration) -> ConfigResult<Self> {
        if hop_timeout.is_zero() {
            return Err(ConfigError::ZeroHopTimeout);
        }
        self.hop_timeout = hop_timeout;
        Ok(self)
    }

    pub fn central_base_url(&self) -> &Url {
        &self.central_base_url
    }

    pub fn local_base_url(&self) -> &Url {
        &self.local_base_url
    }

    pub fn peer_router_base_url(&self) -> Option<&Url> {
        self.peer_router_base_url.as_ref()
    }

    pub fn billing_base_url(&self) -> &Url {
        &self.billing_base_url
    }

    pub fn consultation_base_url(&self) -> &Url {
        &self.consultation_base_url
    }

    pub fn hop_timeout(&self) -> Duration {
        self.hop_timeout
    }
}

/// Parse and validate an upstream base URL.
///
/// Only `http` and `https` are accepted, and the URL must be usable as a base for path
/// segments.
pub fn parse_base_url(name: &'static str, value: &str) -> ConfigResult<Url> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        name,
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be used as a base".into()));
    }
    Ok(url)
}

/// Parse the per-hop timeout from an optional string value (whole seconds).
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_HOP_TIMEOUT`].
pub fn hop_timeout_from_env_value(value: Option<String>) -> ConfigResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let Some(value) = value else {
        return Ok(DEFAULT_HOP_TIMEOUT);
    };

    let secs: u64 = value.parse().map_err(|_| ConfigError::InvalidSeconds {
        name: "HOP_TIMEOUT_SECS",
        value: value.clone(),
    })?;
    if secs == 0 {
        return Err(ConfigError::ZeroHopTimeout);
    }
    Ok(Duration::from_secs(secs))
}

//! Upstream clients and the capabilities the router depends on.
//!
//! The router never talks HTTP itself. It is handed implementations of these traits:
//!
//! - [`PatientReader`]: look a record up by CIN (central registry, local site, peer router)
//! - [`PatientWriter`]: write a record back into a local site
//! - [`CentralRegistry`]: the extra central operations (name search, verbatim create)
//! - [`Forwarder`]: verbatim pass-through for consultations and billing
//!
//! The reqwest-backed implementations live in the submodules. Every one of them is built with a
//! bounded per-hop timeout; a timeout surfaces as [`ClientError::Timeout`].

pub mod central;
pub mod forward;
pub mod local;
pub mod peer;

pub use central::CentralRegistryClient;
pub use forward::HttpForwarder;
pub use local::LocalSiteClient;
pub use peer::PeerRouterClient;

use crate::error::{ClientError, ClientResult};
use crate::wire::{self, WireFormat};
use api_shared::PatientRecord;
use async_trait::async_trait;
use bytes::Bytes;
use novacare_types::{Cin, NonEmptyText};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use std::time::Duration;

// ============================================================================
// Results and payloads
// ============================================================================

/// Outcome of a by-CIN read.
///
/// `Miss` and `Unavailable` are kept apart even where the router treats them the same, so logs
/// and callers can still tell "not there" from "could not ask".
#[derive(Debug)]
pub enum Lookup {
    Found(PatientRecord),
    Miss,
    Unavailable(ClientError),
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// First and last name for a central name search. Both are required.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameQuery {
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
}

/// A request body forwarded verbatim, with its declared content type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    pub body: Bytes,
    pub content_type: Option<String>,
}

impl Payload {
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            content_type: Some(crate::constants::JSON_CONTENT_TYPE.into()),
        }
    }
}

/// An upstream answer relayed to the caller unmodified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// A pass-through call: method, absolute target and optional body.
#[derive(Clone, Debug)]
pub struct ForwardRequest {
    pub method: Method,
    pub url: Url,
    pub payload: Option<Payload>,
}

// ============================================================================
// Capabilities
// ============================================================================

#[async_trait]
pub trait PatientReader: Send + Sync {
    async fn get_by_cin(&self, cin: &Cin) -> Lookup;
}

/// Write-back into a local site.
///
/// Implementations must give upsert-by-CIN semantics: writing the same CIN twice, in sequence or
/// concurrently, leaves exactly one record for that CIN (last writer wins).
#[async_trait]
pub trait PatientWriter: Send + Sync {
    async fn create(&self, record: &PatientRecord) -> ClientResult<()>;
}

#[async_trait]
pub trait CentralRegistry: PatientReader {
    /// `Ok(None)` when no record matches both names.
    async fn get_by_name(&self, query: &NameQuery) -> ClientResult<Option<PatientRecord>>;

    /// Forwards a create request verbatim and relays whatever the registry answers.
    async fn create(&self, payload: Payload) -> ClientResult<UpstreamResponse>;
}

#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: ForwardRequest) -> ClientResult<UpstreamResponse>;
}

// ============================================================================
// Shared HTTP plumbing
// ============================================================================

/// Builds the HTTP client shared by every upstream hop.
pub fn http_client(hop_timeout: Duration) -> ClientResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(hop_timeout)
        .connect_timeout(hop_timeout)
        .build()
        .map_err(ClientError::ClientBuild)
}

/// Appends path segments to a base URL, percent-encoding each one.
pub fn endpoint(base: &Url, segments: &[&str]) -> ClientResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// GETs a single record and classifies the answer into a [`Lookup`].
///
/// 2xx decodes (JSON or XML), 404 is a miss, anything else is unavailable.
pub(crate) async fn fetch_record(http: &reqwest::Client, url: Url) -> Lookup {
    let response = match http
        .get(url.clone())
        .header(ACCEPT, crate::constants::RECORD_ACCEPT)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => return Lookup::Unavailable(ClientError::from_reqwest(&url, e)),
    };

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Lookup::Miss;
    }
    if !status.is_success() {
        return Lookup::Unavailable(ClientError::UnexpectedStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    match read_record(&url, response).await {
        Ok(record) => Lookup::Found(record),
        Err(e) => Lookup::Unavailable(e),
    }
}

pub(crate) async fn read_record(
    url: &Url,
    response: reqwest::Response,
) -> ClientResult<PatientRecord> {
    let declared = content_type(&response);
    let body = response
        .bytes()
        .await
        .map_err(|e| ClientError::from_reqwest(url, e))?;
    let (record, format) = wire::decode_record(&body).map_err(|reason| ClientError::Decode {
        url: url.to_string(),
        reason,
    })?;
    if format == WireFormat::Xml {
        tracing::debug!(
            %url,
            declared = declared.as_deref().unwrap_or("-"),
            "upstream answered XML; transcoded to JSON"
        );
    }
    Ok(record)
}

/// Reads status, content type and body for verbatim relay.
pub(crate) async fn relay(url: &Url, response: reqwest::Response) -> ClientResult<UpstreamResponse> {
    let status = response.status().as_u16();
    let content_type = content_type(&response);
    let body = response
        .bytes()
        .await
        .map_err(|e| ClientError::from_reqwest(url, e))?;
    Ok(UpstreamResponse {
        status,
        content_type,
        body,
    })
}

/// Attaches a verbatim body, defaulting the content type to JSON.
pub(crate) fn with_payload(
    builder: reqwest::RequestBuilder,
    payload: Payload,
) -> reqwest::RequestBuilder {
    let content_type = payload
        .content_type
        .unwrap_or_else(|| crate::constants::JSON_CONTENT_TYPE.into());
    builder.header(CONTENT_TYPE, content_type).body(payload.body)
}

fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_and_encodes_segments() {
        let base = Url::parse("http://central:8080").unwrap();
        let url = endpoint(&base, &["api", "patients", "cin", "AB 12/34"]).unwrap();
        assert_eq!(url.as_str(), "http://central:8080/api/patients/cin/AB%2012%2F34");
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let base = Url::parse("http://gateway/registry/").unwrap();
        let url = endpoint(&base, &["api", "patients"]).unwrap();
        assert_eq!(url.as_str(), "http://gateway/registry/api/patients");
    }

    #[test]
    fn json_payload_declares_content_type() {
        let payload = Payload::json(r#"{"cin":"A"}"#);
        assert_eq!(payload.content_type.as_deref(), Some("application/json"));
    }
}

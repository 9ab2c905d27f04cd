//! Central registry client (patient-core-service).

use super::{
    endpoint, fetch_record, read_record, relay, with_payload, CentralRegistry, Lookup, NameQuery,
    Payload, PatientReader, UpstreamResponse,
};
use crate::constants::{CENTRAL_PATIENTS_PATH, RECORD_ACCEPT};
use crate::error::{ClientError, ClientResult};
use api_shared::PatientRecord;
use async_trait::async_trait;
use novacare_types::Cin;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};

/// HTTP client for the canonical patient store.
///
/// - `GET  {base}/api/patients/cin/{cin}`
/// - `GET  {base}/api/patients/search?firstName=..&lastName=..`
/// - `POST {base}/api/patients`
#[derive(Clone, Debug)]
pub struct CentralRegistryClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CentralRegistryClient {
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    fn patients(&self, tail: &[&str]) -> ClientResult<Url> {
        let mut segments: Vec<&str> = CENTRAL_PATIENTS_PATH.to_vec();
        segments.extend_from_slice(tail);
        endpoint(&self.base_url, &segments)
    }
}

#[async_trait]
impl PatientReader for CentralRegistryClient {
    async fn get_by_cin(&self, cin: &Cin) -> Lookup {
        let url = match self.patients(&["cin", cin.as_str()]) {
            Ok(url) => url,
            Err(e) => return Lookup::Unavailable(e),
        };
        tracing::debug!(%cin, %url, "central registry: lookup by CIN");
        fetch_record(&self.http, url).await
    }
}

#[async_trait]
impl CentralRegistry for CentralRegistryClient {
    async fn get_by_name(&self, query: &NameQuery) -> ClientResult<Option<PatientRecord>> {
        let mut url = self.patients(&["search"])?;
        url.query_pairs_mut()
            .append_pair("firstName", query.first_name.as_str())
            .append_pair("lastName", query.last_name.as_str());
        tracing::debug!(%url, "central registry: lookup by name");

        let response = self
            .http
            .get(url.clone())
            .header(ACCEPT, RECORD_ACCEPT)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(&url, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => read_record(&url, response).await.map(Some),
            status => Err(ClientError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn create(&self, payload: Payload) -> ClientResult<UpstreamResponse> {
        let url = self.patients(&[])?;
        tracing::debug!(%url, bytes = payload.body.len(), "central registry: create");
        let response = with_payload(self.http.post(url.clone()), payload)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(&url, e))?;
        relay(&url, response).await
    }
}

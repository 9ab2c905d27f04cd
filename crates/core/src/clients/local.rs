//! Local site store client (cardio-consultation-service).

use super::{endpoint, fetch_record, Lookup, PatientReader, PatientWriter};
use crate::constants::LOCAL_PATIENT_PATH;
use crate::error::{ClientError, ClientResult};
use api_shared::PatientRecord;
use async_trait::async_trait;
use novacare_types::Cin;
use reqwest::Url;

/// HTTP client for a site-local patient cache.
///
/// - `GET  {base}/api/local_patient/cin/{cin}`
/// - `POST {base}/api/local_patient` (write-back)
///
/// The local store keys its records by the `id` it is given, and the router writes back the
/// central record unchanged, so the central id becomes the local key. Repeated or concurrent
/// write-backs of the same patient therefore replace one another instead of accumulating,
/// which is the upsert-by-CIN contract [`PatientWriter`] requires.
#[derive(Clone, Debug)]
pub struct LocalSiteClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LocalSiteClient {
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    fn local_patient(&self, tail: &[&str]) -> ClientResult<Url> {
        let mut segments: Vec<&str> = LOCAL_PATIENT_PATH.to_vec();
        segments.extend_from_slice(tail);
        endpoint(&self.base_url, &segments)
    }
}

#[async_trait]
impl PatientReader for LocalSiteClient {
    async fn get_by_cin(&self, cin: &Cin) -> Lookup {
        let url = match self.local_patient(&["cin", cin.as_str()]) {
            Ok(url) => url,
            Err(e) => return Lookup::Unavailable(e),
        };
        tracing::debug!(%cin, %url, "local site: lookup by CIN");
        fetch_record(&self.http, url).await
    }
}

#[async_trait]
impl PatientWriter for LocalSiteClient {
    async fn create(&self, record: &PatientRecord) -> ClientResult<()> {
        let url = self.local_patient(&[])?;
        tracing::debug!(cin = %record.cin, %url, "local site: write-back");
        let response = self
            .http
            .post(url.clone())
            .json(record)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

//! Peer router client: the central-tier router's search endpoint.

use super::{endpoint, fetch_record, Lookup, PatientReader};
use crate::constants::PEER_SEARCH_PATH;
use async_trait::async_trait;
use novacare_types::Cin;
use reqwest::Url;

/// Reads central records through another router's `GET /api/patient/search?cin=..`.
///
/// Used for the check-in central hop when a site router sits behind a central-tier router
/// instead of reaching the registry directly. The peer answers 404 with an error body on a
/// miss, which maps to [`Lookup::Miss`] like a registry 404.
#[derive(Clone, Debug)]
pub struct PeerRouterClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PeerRouterClient {
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl PatientReader for PeerRouterClient {
    async fn get_by_cin(&self, cin: &Cin) -> Lookup {
        let mut url = match endpoint(&self.base_url, &PEER_SEARCH_PATH) {
            Ok(url) => url,
            Err(e) => return Lookup::Unavailable(e),
        };
        url.query_pairs_mut().append_pair("cin", cin.as_str());
        tracing::debug!(%cin, %url, "peer router: search by CIN");
        fetch_record(&self.http, url).await
    }
}

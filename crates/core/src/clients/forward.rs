//! Verbatim pass-through forwarding.

use super::{relay, with_payload, ForwardRequest, Forwarder, UpstreamResponse};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;

/// Forwards method, body and content type unchanged and relays the answer unchanged.
#[derive(Clone, Debug)]
pub struct HttpForwarder {
    http: reqwest::Client,
}

impl HttpForwarder {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, request: ForwardRequest) -> ClientResult<UpstreamResponse> {
        let ForwardRequest {
            method,
            url,
            payload,
        } = request;
        tracing::debug!(%method, %url, "pass-through");

        let mut builder = self.http.request(method, url.clone());
        if let Some(payload) = payload {
            builder = with_payload(builder, payload);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(&url, e))?;
        relay(&url, response).await
    }
}

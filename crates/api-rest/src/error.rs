//! Mapping from router failures to HTTP answers.

use api_shared::ErrorBody;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use novacare_core::RouterError;

/// A router failure on its way out as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(RouterError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RouterError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RouterError::NotFound => StatusCode::NOT_FOUND,
            RouterError::CentralUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RouterError::Downstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

}

impl From<RouterError> for ApiError {
    fn from(err: RouterError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::debug!(error = %self.0, %status, "answering with upstream failure");
        }
        (status, Json(ErrorBody::new(self.0.message()))).into_response()
    }
}

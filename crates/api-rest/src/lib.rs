//! # API REST
//!
//! HTTP surface of the NovaCare integration router.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, CORS, request ids, verbatim relay of upstream answers)
//!
//! Every decision about which tier answers lives in `novacare-core`; handlers only translate
//! between HTTP and [`IntegrationRouter`] calls.

#![warn(rust_2018_idioms)]

mod error;

pub use error::ApiError;

use api_shared::{
    ErrorBody, HealthRes, HealthService, PatientRecord, RECORD_ORIGIN_HEADER, REQUEST_ID_HEADER,
};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, Request},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use novacare_core::{require_cin, IntegrationRouter, PatientQuery, Payload, UpstreamResponse};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{IntoParams, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    router: IntegrationRouter,
    health: Arc<HealthService>,
}

impl AppState {
    pub fn new(router: IntegrationRouter, health: HealthService) -> Self {
        Self {
            router,
            health: Arc::new(health),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        actuator_health,
        search_patient,
        create_patient,
        checkin,
        consultations,
        generate_billing,
    ),
    components(schemas(HealthRes, PatientRecord, ErrorBody))
)]
struct ApiDoc;

/// Builds the full HTTP application around a router.
///
/// Requests get a UUID `x-request-id` (kept if the caller already sent one), which is echoed on
/// the response and recorded on the request span.
pub fn build_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health))
        .route("/actuator/health", get(actuator_health))
        .route("/api/patient/search", get(search_patient))
        .route("/api/patient/create", post(create_patient))
        .route("/api/checkin", get(checkin))
        .route("/api/consultation/patient/:patient_id", get(consultations))
        .route("/api/billing/generate", post(generate_billing))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), UuidRequestId))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[derive(Clone, Copy, Debug, Default)]
struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id,
    )
}

// ============================================================================
// Health
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for load balancers and monitoring.
///
/// Upstream reachability is not probed.
#[axum::debug_handler]
async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(state.health.check_health())
}

#[utoipa::path(
    get,
    path = "/actuator/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
#[axum::debug_handler]
async fn actuator_health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(state.health.check_health())
}

// ============================================================================
// Patient lookup
// ============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
struct SearchParams {
    /// National identity number. Takes precedence over the names.
    cin: Option<String>,
    /// Used together with `lastName` when no CIN is given.
    first_name: Option<String>,
    /// Used together with `firstName` when no CIN is given.
    last_name: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/patient/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Patient found in the central registry", body = PatientRecord),
        (status = 400, description = "Missing CIN, or only one of the two names", body = ErrorBody),
        (status = 404, description = "Patient not found", body = ErrorBody),
        (status = 503, description = "Central registry unavailable", body = ErrorBody)
    )
)]
/// Search the central registry by CIN, or by first and last name together.
///
/// # Errors
/// Returns `400 Bad Request` before any upstream call if the parameters do not form a valid
/// query.
#[axum::debug_handler]
async fn search_patient(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<PatientRecord>, ApiError> {
    let query = PatientQuery::from_params(
        params.cin.as_deref(),
        params.first_name.as_deref(),
        params.last_name.as_deref(),
    )?;
    Ok(Json(state.router.lookup(&query).await?))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct CheckinParams {
    /// National identity number of the arriving patient.
    cin: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/checkin",
    params(CheckinParams),
    responses(
        (status = 200, description = "Patient available at this site; X-Record-Origin says from where", body = PatientRecord),
        (status = 400, description = "Missing CIN", body = ErrorBody),
        (status = 404, description = "Patient not found on either tier", body = ErrorBody),
        (status = 503, description = "Central tier unavailable", body = ErrorBody)
    )
)]
/// Check a patient in at this site.
///
/// Reads the local site first; on a miss the record is fetched from the central tier and
/// written back locally before answering. The `X-Record-Origin` header is `local`,
/// `central-synced` or, when the write-back failed, `central-unsynced`.
#[axum::debug_handler]
async fn checkin(
    State(state): State<AppState>,
    Query(params): Query<CheckinParams>,
) -> Result<Response, ApiError> {
    let cin = require_cin(params.cin.as_deref())?;
    let outcome = state.router.checkin(&cin).await?;
    let origin = outcome.origin();
    Ok((
        [(RECORD_ORIGIN_HEADER, origin.as_str())],
        Json(outcome.into_record()),
    )
        .into_response())
}

// ============================================================================
// Pass-through
// ============================================================================

#[utoipa::path(
    post,
    path = "/api/patient/create",
    request_body(content = String, description = "Patient record, forwarded verbatim", content_type = "application/json"),
    responses(
        (status = 201, description = "Central registry answer, relayed verbatim"),
        (status = 502, description = "Central registry unreachable", body = ErrorBody)
    )
)]
/// Create a patient in the central registry.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let response = state.router.create(payload(&headers, body)).await?;
    Ok(relay(response))
}

#[utoipa::path(
    get,
    path = "/api/consultation/patient/{patient_id}",
    params(("patient_id" = String, Path, description = "Local site patient id")),
    responses(
        (status = 200, description = "Consultation service answer, relayed verbatim"),
        (status = 502, description = "Consultation service unreachable", body = ErrorBody)
    )
)]
/// List a patient's consultations.
#[axum::debug_handler]
async fn consultations(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Response, ApiError> {
    let response = state.router.consultations(&patient_id).await?;
    Ok(relay(response))
}

#[utoipa::path(
    post,
    path = "/api/billing/generate",
    request_body(content = String, description = "Billing request, forwarded verbatim", content_type = "application/json"),
    responses(
        (status = 200, description = "Billing service answer, relayed verbatim"),
        (status = 502, description = "Billing service unreachable", body = ErrorBody)
    )
)]
#[axum::debug_handler]
async fn generate_billing(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let response = state.router.billing_generate(payload(&headers, body)).await?;
    Ok(relay(response))
}

fn payload(headers: &HeaderMap, body: Bytes) -> Payload {
    Payload {
        body,
        content_type: headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

/// Turns an upstream answer into a response with the same status, content type and body.
fn relay(upstream: UpstreamResponse) -> Response {
    let status = axum::http::StatusCode::from_u16(upstream.status)
        .unwrap_or(axum::http::StatusCode::BAD_GATEWAY);
    let mut response = (status, upstream.body).into_response();

    let headers = response.headers_mut();
    match upstream
        .content_type
        .and_then(|ct| HeaderValue::from_str(&ct).ok())
    {
        Some(content_type) => {
            headers.insert(CONTENT_TYPE, content_type);
        }
        None => {
            headers.remove(CONTENT_TYPE);
        }
    }
    response
}

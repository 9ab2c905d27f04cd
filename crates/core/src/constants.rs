//! Constants used throughout the router core.
//!
//! Upstream path layouts and default service locations live here so that the clients and the
//! configuration agree on them.

use std::time::Duration;

/// Default central patient registry (patient-core-service).
pub const DEFAULT_CENTRAL_BASE_URL: &str = "http://patient-core-service:8080";

/// Default local site store (cardio-consultation-service). Also serves consultations.
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://cardio-consultation-service:5000";

/// Default billing service.
pub const DEFAULT_BILLING_BASE_URL: &str = "http://billing-service:3000";

/// Default per-hop timeout for every upstream call.
pub const DEFAULT_HOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Central registry: `/api/patients/...`.
pub const CENTRAL_PATIENTS_PATH: [&str; 2] = ["api", "patients"];

/// Local site store: `/api/local_patient/...`.
pub const LOCAL_PATIENT_PATH: [&str; 2] = ["api", "local_patient"];

/// Peer router search: `/api/patient/search`.
pub const PEER_SEARCH_PATH: [&str; 3] = ["api", "patient", "search"];

/// Consultation service: `/api/consultation/patient/{patientId}`.
pub const CONSULTATION_PATH: [&str; 3] = ["api", "consultation", "patient"];

/// Billing service: `/api/billing/generate`.
pub const BILLING_GENERATE_PATH: [&str; 3] = ["api", "billing", "generate"];

/// Accept header sent on record reads. XML is still decoded when a registry insists on it.
pub const RECORD_ACCEPT: &str = "application/json, application/xml;q=0.9";

pub const JSON_CONTENT_TYPE: &str = "application/json";

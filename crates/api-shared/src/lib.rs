//! # API Shared
//!
//! Shared wire definitions for the NovaCare integration router.
//!
//! Contains:
//! - The patient record exchanged between the central registry and local sites (`model`)
//! - The structured error body and the fixed caller-facing messages
//! - Shared services like `HealthService`
//!
//! Used by `novacare-core`, `api-rest` and the CLI so that every surface speaks the same JSON.

pub mod health;
pub mod model;

pub use health::{HealthRes, HealthService};
pub use model::{ErrorBody, PatientRecord};

/// Response header naming where a check-in record came from.
pub const RECORD_ORIGIN_HEADER: &str = "x-record-origin";

/// Request/response header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Fixed error messages returned to callers.
pub mod messages {
    /// Neither the local site nor the central registry holds the patient.
    pub const PATIENT_NOT_FOUND: &str = "Patient non trouvé";
    /// A CIN-targeted operation was called without a CIN.
    pub const CIN_REQUIRED: &str = "CIN parameter is required";
    /// A name search supplied only one of the two names.
    pub const NAME_PAIR_REQUIRED: &str = "firstName and lastName are both required";
    /// The central tier could not be reached or answered with an unexpected status.
    pub const CENTRAL_UNAVAILABLE: &str = "Erreur communication avec le siège";
    /// A pass-through target could not be reached.
    pub const DOWNSTREAM_UNAVAILABLE: &str = "Service en aval indisponible";
}

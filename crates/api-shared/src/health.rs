use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Liveness payload served on `/health` and `/actuator/health`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub status: String,
    pub service: String,
}

/// Simple health service used by the REST surface and the CLI.
///
/// The router holds no state of its own, so liveness only reports that the process answers.
/// Upstream reachability is not probed.
#[derive(Clone, Debug)]
pub struct HealthService {
    service: String,
}

impl HealthService {
    /// Creates a health service reporting under the given service name.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Returns a `HealthRes` indicating the service is up.
    pub fn check_health(&self) -> HealthRes {
        HealthRes {
            status: "UP".into(),
            service: self.service.clone(),
        }
    }
}

impl Default for HealthService {
    fn default() -> Self {
        Self::new("novacare-router")
    }
}

//! # NovaCare Core
//!
//! Routing logic for the NovaCare patient integration layer.
//!
//! A hospital site keeps a local copy of the patients it treats; the central registry holds the
//! authoritative record for everyone. This crate decides which tier answers a request:
//! - Check-in reads the local site first, falls back to the central tier and writes the record
//!   back locally
//! - Search and create go straight to the central registry
//! - Consultations and billing are relayed verbatim to their services
//!
//! **No API concerns**: the HTTP surface lives in `api-rest`, the command line in `cli`.

pub mod clients;
pub mod config;
pub mod constants;
pub mod error;
pub mod router;
pub mod wire;

pub use api_shared::PatientRecord;
pub use clients::{Lookup, NameQuery, Payload, UpstreamResponse};
pub use config::RouterConfig;
pub use error::{ClientError, ClientResult, ConfigError, ConfigResult, RouterError, RouterResult};
pub use novacare_types::{Cin, NonEmptyText};
pub use router::{
    require_cin, CheckinOutcome, Downstream, IntegrationRouter, PatientQuery, RecordOrigin,
};

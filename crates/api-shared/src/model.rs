//! Patient record wire model.
//!
//! The same JSON shape is served by the central registry, by the local site stores and by the
//! router itself:
//!
//! ```json
//! {
//!   "id": 1,
//!   "cin": "AB123456",
//!   "firstName": "Ahmed",
//!   "lastName": "Benali",
//!   "dateOfBirth": "1985-03-15",
//!   "email": "ahmed@example.ma",
//!   "phone": "+212600000000",
//!   "address": "Casablanca",
//!   "allergies": ["Pénicilline"],
//!   "medicalHistory": ["Hypertension"]
//! }
//! ```
//!
//! Notes:
//! - `id` is assigned independently by each store (an integer centrally, a string locally) and
//!   is kept opaque. Only `cin` joins records across stores.
//! - Fields a store adds on its own (for example `syncedAt`) are ignored on read.
//! - `null` is accepted wherever a default exists.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

// ============================================================================
// Patient record
// ============================================================================

/// The unit exchanged between the central registry and the local sites.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    /// Store-local surrogate identifier. Never compared across stores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub id: Option<serde_json::Value>,

    /// National identity number.
    #[serde(default, deserialize_with = "null_as_default")]
    pub cin: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,

    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_birth: Option<NaiveDate>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    /// Free-text allergies. Order is kept, duplicates are kept.
    #[serde(default, deserialize_with = "null_as_default")]
    pub allergies: Vec<String>,

    /// Free-text history entries. Same properties as `allergies`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub medical_history: Vec<String>,
}

impl PatientRecord {
    /// Compares every business field, ignoring the store-local `id`.
    ///
    /// This is the comparison to use between a central record and its local copy.
    pub fn same_business_fields(&self, other: &PatientRecord) -> bool {
        self.cin == other.cin
            && self.first_name == other.first_name
            && self.last_name == other.last_name
            && self.date_of_birth == other.date_of_birth
            && self.email == other.email
            && self.phone == other.phone
            && self.address == other.address
            && self.allergies == other.allergies
            && self.medical_history == other.medical_history
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Error body
// ============================================================================

/// Structured error payload: `{"error": "..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

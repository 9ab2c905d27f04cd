//! Upstream body decoding.
//!
//! Registries may answer a record read in JSON or, when content negotiation goes their way, in
//! Jackson-style XML:
//!
//! ```text
//! <Patient>
//!   <id>1</id>
//!   <cin>AB123456</cin>
//!   <firstName>Ahmed</firstName>
//!   ...
//!   <allergies><allergies>Pénicilline</allergies></allergies>
//!   <medicalHistory><medicalHistory>Hypertension</medicalHistory></medicalHistory>
//! </Patient>
//! ```
//!
//! Both are decoded into a [`PatientRecord`], so the router always answers with real JSON.
//! A body whose first non-whitespace byte is `<` is XML whatever its declared content type;
//! anything else is read as JSON.

use api_shared::PatientRecord;
use chrono::NaiveDate;
use serde::Deserialize;

/// Body encoding detected on an upstream answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireFormat {
    Json,
    Xml,
}

impl WireFormat {
    /// Detects the encoding from the body. Declared content types are not trusted.
    pub fn detect(body: &[u8]) -> Self {
        match body.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'<') => WireFormat::Xml,
            _ => WireFormat::Json,
        }
    }
}

/// Decodes a patient record, returning the format it arrived in.
///
/// A body that parses but carries no CIN (an HTML page, `{}`, an error object) is not a patient
/// record and is rejected. The error is a human-readable reason; callers wrap it with the
/// upstream URL.
pub fn decode_record(body: &[u8]) -> Result<(PatientRecord, WireFormat), String> {
    let format = WireFormat::detect(body);
    let record = match format {
        WireFormat::Json => serde_json::from_slice(body).map_err(|e| e.to_string())?,
        WireFormat::Xml => {
            let text = std::str::from_utf8(body).map_err(|e| e.to_string())?;
            let xml: XmlPatient = quick_xml::de::from_str(text).map_err(|e| e.to_string())?;
            xml.into_record()?
        }
    };
    if record.cin.trim().is_empty() {
        return Err("body is not a patient record: cin is missing".into());
    }
    Ok((record, format))
}

// ============================================================================
// XML wire model
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct XmlPatient {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    cin: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    date_of_birth: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    allergies: Option<AllergyList>,
    #[serde(default)]
    medical_history: Option<HistoryList>,
}

// Jackson wraps collections in an element named like the property, repeating the same name
// for each item.
#[derive(Debug, Default, Deserialize)]
struct AllergyList {
    #[serde(rename = "allergies", default)]
    items: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HistoryList {
    #[serde(rename = "medicalHistory", default)]
    items: Vec<String>,
}

impl XmlPatient {
    fn into_record(self) -> Result<PatientRecord, String> {
        let date_of_birth = non_blank(self.date_of_birth)
            .map(|d| {
                NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                    .map_err(|e| format!("invalid dateOfBirth {d:?}: {e}"))
            })
            .transpose()?;

        // Numeric ids stay numeric so the JSON answer matches what the registry would send.
        let id = non_blank(self.id).map(|raw| match raw.parse::<i64>() {
            Ok(n) => serde_json::Value::from(n),
            Err(_) => serde_json::Value::from(raw),
        });

        Ok(PatientRecord {
            id,
            cin: self.cin.unwrap_or_default().trim().to_string(),
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            date_of_birth,
            email: non_blank(self.email),
            phone: non_blank(self.phone),
            address: non_blank(self.address),
            allergies: self.allergies.unwrap_or_default().items,
            medical_history: self.medical_history.unwrap_or_default().items,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

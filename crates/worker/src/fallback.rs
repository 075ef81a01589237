//! Canned offline payloads for API calls that neither the network nor the
//! dynamic partition could answer.
//!
//! Every payload is well-formed JSON, so callers never need a "no response"
//! branch.

use ruralcare_core::url::path_of;
use ruralcare_core::{Request, Response};
use serde::{Deserialize, Serialize};

/// API category of a fallback payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackKind {
    Pharmacy,
    HealthRecords,
    Symptoms,
    Unavailable,
}

impl FallbackKind {
    /// Category selected by substring of the URL path. First match wins.
    pub fn for_path(path: &str) -> Self {
        if path.contains("pharmacy") {
            FallbackKind::Pharmacy
        } else if path.contains("health-records") {
            FallbackKind::HealthRecords
        } else if path.contains("symptoms") {
            FallbackKind::Symptoms
        } else {
            FallbackKind::Unavailable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: u32,
    pub name: String,
    pub pharmacy: String,
    pub availability: String,
    pub price: String,
    pub distance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PharmacyPayload {
    pub medicines: Vec<Medicine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecordsPayload {
    pub records: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomAnalysis {
    pub possible_conditions: Vec<String>,
    pub recommended_actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomsPayload {
    pub analysis: SymptomAnalysis,
}

/// Generic envelope for categories without canned data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineEnvelope {
    pub error: String,
    pub message: String,
}

fn medicine(id: u32, name: &str, pharmacy: &str, availability: &str, price: &str, distance: &str) -> Medicine {
    Medicine {
        id,
        name: name.into(),
        pharmacy: pharmacy.into(),
        availability: availability.into(),
        price: price.into(),
        distance: distance.into(),
    }
}

pub fn pharmacy_payload() -> PharmacyPayload {
    PharmacyPayload {
        medicines: vec![
            medicine(1, "Paracetamol 500mg", "Rural Health Pharmacy", "available", "₹25", "2.5 km"),
            medicine(2, "Amoxicillin 250mg", "Village Medical Store", "low-stock", "₹45", "1.8 km"),
        ],
    }
}

pub fn symptoms_payload() -> SymptomsPayload {
    SymptomsPayload {
        analysis: SymptomAnalysis {
            possible_conditions: vec!["General Malaise".into()],
            recommended_actions: vec!["Monitor symptoms".into(), "Consult healthcare provider if symptoms persist".into()],
        },
    }
}

/// Synthesize the substitute response for `request`.
pub fn provide(request: &Request) -> Response {
    let kind = FallbackKind::for_path(path_of(request.url().as_str()));
    tracing::info!(url = %request.url(), ?kind, "serving offline fallback");

    let built = match kind {
        FallbackKind::Pharmacy => Response::json(200, "OK", &pharmacy_payload()),
        FallbackKind::HealthRecords => Response::json(200, "OK", &HealthRecordsPayload { records: Vec::new() }),
        FallbackKind::Symptoms => Response::json(200, "OK", &symptoms_payload()),
        FallbackKind::Unavailable => Response::json(503, "Service Unavailable", &unavailable()),
    };

    // The payload types above always serialize.
    built.unwrap_or_else(|_| {
        Response::new(503, "Service Unavailable", r#"{"error":"Offline","message":"Service temporarily unavailable"}"#)
            .with_header("content-type", "application/json")
    })
}

fn unavailable() -> OfflineEnvelope {
    OfflineEnvelope { error: "Offline".into(), message: "Service temporarily unavailable".into() }
}

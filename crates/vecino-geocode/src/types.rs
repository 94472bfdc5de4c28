//! Domain types shared by both geocoding provider clients.

use serde::Serialize;

/// Which external service produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Mapbox,
    Nominatim,
}

impl Provider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Mapbox => "mapbox",
            Provider::Nominatim => "nominatim",
        }
    }
}

/// Structured address fields attached to a candidate or returned by reverse
/// geocoding. Fields the provider cannot resolve stay empty strings, never
/// null — callers only ever reason about presence/absence of text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressFields {
    pub address: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
}

impl AddressFields {
    /// True when no field carries any text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.address.is_empty()
            && self.city.is_empty()
            && self.state.is_empty()
            && self.postcode.is_empty()
    }
}

/// One geocoded result for a forward query.
///
/// Invariants enforced at construction: `lat`/`lng` are finite, `label` is
/// non-empty, and `id` is unique within a single provider response.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub id: String,
    pub label: String,
    pub lat: f64,
    pub lng: f64,
    pub extra: AddressFields,
    pub provider: Provider,
}

impl Candidate {
    /// Key used to collapse near-identical candidates across providers:
    /// coordinates at microdegree precision plus the lowercased label.
    /// Integer microdegrees keep the key `Eq + Hash` without comparing floats.
    #[must_use]
    pub fn dedup_key(&self) -> (i64, i64, String) {
        (
            microdegrees(self.lat),
            microdegrees(self.lng),
            self.label.to_lowercase(),
        )
    }
}

/// Round a coordinate to six decimal places and express it as integer
/// microdegrees (~0.1 m of precision).
#[must_use]
pub fn microdegrees(coord: f64) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    let micro = (coord * 1_000_000.0).round() as i64;
    micro
}

/// Synthesize a candidate id from the provider name and the external record
/// id, falling back to rounded coordinates plus the ordinal position when the
/// provider assigned none.
#[must_use]
pub fn synthesize_id(
    provider: Provider,
    external_id: Option<&str>,
    lat: f64,
    lng: f64,
    index: usize,
) -> String {
    match external_id {
        Some(ext) if !ext.is_empty() => format!("{}:{ext}", provider.as_str()),
        _ => format!(
            "{}:{}:{}:{index}",
            provider.as_str(),
            microdegrees(lat),
            microdegrees(lng)
        ),
    }
}

/// True when both coordinates are finite numbers.
#[must_use]
pub fn coordinates_valid(lat: f64, lng: f64) -> bool {
    lat.is_finite() && lng.is_finite()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

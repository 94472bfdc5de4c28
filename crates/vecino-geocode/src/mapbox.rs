//! HTTP client for the Mapbox Geocoding API (the token-gated provider).
//!
//! Wraps `reqwest` with typed response deserialization and the engine's
//! absorb-at-boundary failure policy: the public [`MapboxClient::forward`] and
//! [`MapboxClient::reverse`] methods turn every transport, status, or parse
//! failure into an empty result so upper layers only reason about presence or
//! absence of data.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::GeocodeError;
use crate::types::{synthesize_id, AddressFields, Candidate, coordinates_valid, Provider};

const DEFAULT_BASE_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places";

/// Client for the Mapbox forward/reverse geocoding endpoints.
///
/// Use [`MapboxClient::new`] for production or [`MapboxClient::with_base_url`]
/// to point at a mock server in tests.
pub struct MapboxClient {
    client: Client,
    access_token: String,
    base_url: Url,
    language: String,
}

impl MapboxClient {
    /// Creates a new client pointed at the production Mapbox API.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        access_token: &str,
        language: &str,
        timeout_secs: u64,
    ) -> Result<Self, GeocodeError> {
        Self::with_base_url(access_token, language, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GeocodeError::InvalidBaseUrl`] if
    /// `base_url` does not parse as an absolute URL.
    pub fn with_base_url(
        access_token: &str,
        language: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("vecino/0.1 (community-locator)")
            .build()?;

        let trimmed = base_url.trim_end_matches('/');
        let base_url = Url::parse(trimmed)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| GeocodeError::InvalidBaseUrl(trimmed.to_owned()))?;

        Ok(Self {
            client,
            access_token: access_token.to_owned(),
            base_url,
            language: language.to_owned(),
        })
    }

    /// Forward-geocodes `query`, returning at most `limit` candidates.
    ///
    /// Any failure is logged and absorbed into an empty list. Candidates with
    /// non-finite coordinates or empty labels are dropped.
    pub async fn forward(&self, query: &str, limit: usize) -> Vec<Candidate> {
        match self.try_forward(query, limit).await {
            Ok(candidates) => candidates,
            Err(error) => {
                tracing::warn!(query, %error, "mapbox forward geocode failed; treating as no results");
                Vec::new()
            }
        }
    }

    /// Reverse-geocodes a coordinate pair into structured address fields.
    ///
    /// Any failure is logged and absorbed into an empty [`AddressFields`].
    pub async fn reverse(&self, lat: f64, lng: f64) -> AddressFields {
        match self.try_reverse(lat, lng).await {
            Ok(fields) => fields,
            Err(error) => {
                tracing::warn!(lat, lng, %error, "mapbox reverse geocode failed; treating as no result");
                AddressFields::default()
            }
        }
    }

    /// Fallible variant of [`MapboxClient::forward`].
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::Http`] on network failure or non-2xx HTTP status.
    /// - [`GeocodeError::Deserialize`] if the response shape is unexpected.
    pub async fn try_forward(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, GeocodeError> {
        let url = self.endpoint_url(&format!("{query}.json"), limit);
        let body = self.request_json(&url).await?;
        let response: ForwardResponse =
            serde_json::from_value(body).map_err(|e| GeocodeError::Deserialize {
                context: format!("mapbox forward(query={query})"),
                source: e,
            })?;

        Ok(response
            .features
            .into_iter()
            .enumerate()
            .filter_map(|(index, feature)| feature_to_candidate(feature, index))
            .take(limit)
            .collect())
    }

    /// Fallible variant of [`MapboxClient::reverse`].
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::Http`] on network failure or non-2xx HTTP status.
    /// - [`GeocodeError::Deserialize`] if the response shape is unexpected.
    pub async fn try_reverse(&self, lat: f64, lng: f64) -> Result<AddressFields, GeocodeError> {
        let url = self.endpoint_url(&format!("{lng},{lat}.json"), 1);
        let body = self.request_json(&url).await?;
        let response: ForwardResponse =
            serde_json::from_value(body).map_err(|e| GeocodeError::Deserialize {
                context: format!("mapbox reverse({lat},{lng})"),
                source: e,
            })?;

        Ok(response
            .features
            .into_iter()
            .next()
            .map(feature_to_address)
            .unwrap_or_default())
    }

    /// Builds the full request URL: the endpoint name becomes the final path
    /// segment (percent-encoded by `Url`), token and options go in the query
    /// string.
    fn endpoint_url(&self, endpoint: &str, limit: usize) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(endpoint);
        }
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("access_token", &self.access_token);
            pairs.append_pair("limit", &limit.to_string());
            pairs.append_pair("language", &self.language);
        }
        url
    }

    /// Sends a GET request, asserts a 2xx status, and parses the body as JSON.
    async fn request_json(&self, url: &Url) -> Result<serde_json::Value, GeocodeError> {
        let response = self.client.get(url.clone()).send().await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ForwardResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    place_name: Option<String>,
    /// `[lng, lat]` per the Mapbox convention.
    #[serde(default)]
    center: Vec<f64>,
    #[serde(default)]
    context: Vec<ContextEntry>,
}

/// One entry of a feature's `context` array. The `id` is prefixed with the
/// entry kind, e.g. `"postcode.1234"`, `"place.5678"`, `"region.9"`.
#[derive(Debug, Deserialize)]
struct ContextEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    text: String,
}

fn context_text(context: &[ContextEntry], kind: &str) -> String {
    context
        .iter()
        .find(|entry| entry.id.starts_with(kind))
        .map(|entry| entry.text.clone())
        .unwrap_or_default()
}

fn feature_to_candidate(feature: Feature, index: usize) -> Option<Candidate> {
    let (lng, lat) = match feature.center.as_slice() {
        [lng, lat, ..] => (*lng, *lat),
        _ => {
            tracing::warn!(?feature.id, "mapbox feature missing center; dropping");
            return None;
        }
    };
    if !coordinates_valid(lat, lng) {
        tracing::warn!(?feature.id, lat, lng, "mapbox feature has non-finite coordinates; dropping");
        return None;
    }

    let label = feature
        .place_name
        .clone()
        .or_else(|| feature.text.clone())
        .unwrap_or_default();
    if label.trim().is_empty() {
        return None;
    }

    let extra = AddressFields {
        address: label.clone(),
        city: context_text(&feature.context, "place"),
        state: context_text(&feature.context, "region"),
        postcode: context_text(&feature.context, "postcode"),
    };

    Some(Candidate {
        id: synthesize_id(Provider::Mapbox, feature.id.as_deref(), lat, lng, index),
        label,
        lat,
        lng,
        extra,
        provider: Provider::Mapbox,
    })
}

fn feature_to_address(feature: Feature) -> AddressFields {
    AddressFields {
        address: feature
            .place_name
            .or(feature.text)
            .unwrap_or_default(),
        city: context_text(&feature.context, "place"),
        state: context_text(&feature.context, "region"),
        postcode: context_text(&feature.context, "postcode"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> MapboxClient {
        MapboxClient::with_base_url("test-token", "es", 30, base_url)
            .expect("client construction should not fail")
    }

    #[test]
    fn endpoint_url_encodes_query_and_token() {
        let client = test_client("https://api.mapbox.com/geocoding/v5/mapbox.places");
        let url = client.endpoint_url("Av. Siempre Viva 742.json", 5);
        let rendered = url.as_str();
        assert!(rendered.contains("access_token=test-token"), "{rendered}");
        assert!(rendered.contains("limit=5"), "{rendered}");
        assert!(rendered.contains("language=es"), "{rendered}");
        assert!(
            rendered.contains("Av.%20Siempre%20Viva%20742.json"),
            "query must be percent-encoded as a path segment: {rendered}"
        );
    }

    #[test]
    fn rejects_base_url_that_cannot_be_a_base() {
        let result = MapboxClient::with_base_url("t", "es", 30, "mailto:nobody");
        assert!(matches!(result, Err(GeocodeError::InvalidBaseUrl(_))));
    }

    #[test]
    fn feature_without_center_is_dropped() {
        let feature = Feature {
            id: Some("poi.1".to_string()),
            text: Some("Somewhere".to_string()),
            place_name: None,
            center: vec![],
            context: vec![],
        };
        assert!(feature_to_candidate(feature, 0).is_none());
    }

    #[test]
    fn feature_with_empty_label_is_dropped() {
        let feature = Feature {
            id: Some("poi.2".to_string()),
            text: None,
            place_name: Some("   ".to_string()),
            center: vec![-58.4, -34.6],
            context: vec![],
        };
        assert!(feature_to_candidate(feature, 0).is_none());
    }

    #[test]
    fn feature_context_maps_into_address_fields() {
        let feature = Feature {
            id: Some("address.77".to_string()),
            text: Some("Siempre Viva".to_string()),
            place_name: Some("Av. Siempre Viva 742, Springfield, Buenos Aires".to_string()),
            center: vec![-58.381_592, -34.603_722],
            context: vec![
                ContextEntry {
                    id: "postcode.1".to_string(),
                    text: "B1675".to_string(),
                },
                ContextEntry {
                    id: "place.2".to_string(),
                    text: "Springfield".to_string(),
                },
                ContextEntry {
                    id: "region.3".to_string(),
                    text: "Buenos Aires".to_string(),
                },
            ],
        };
        let candidate = feature_to_candidate(feature, 0).expect("candidate should be kept");
        assert_eq!(candidate.id, "mapbox:address.77");
        assert_eq!(candidate.extra.city, "Springfield");
        assert_eq!(candidate.extra.state, "Buenos Aires");
        assert_eq!(candidate.extra.postcode, "B1675");
        assert_eq!(candidate.provider, Provider::Mapbox);
        assert!((candidate.lat - (-34.603_722)).abs() < 1e-9);
        assert!((candidate.lng - (-58.381_592)).abs() < 1e-9);
    }
}

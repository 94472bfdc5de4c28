//! HTTP client for the Nominatim (OpenStreetMap) geocoder — the keyless,
//! always-available provider.
//!
//! Same failure policy as the Mapbox client: the public methods absorb every
//! transport, status, or parse failure into an empty result.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::GeocodeError;
use crate::types::{synthesize_id, AddressFields, Candidate, coordinates_valid, Provider};

const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Client for the Nominatim `/search` and `/reverse` endpoints.
pub struct NominatimClient {
    client: Client,
    base_url: Url,
    language: String,
}

impl NominatimClient {
    /// Creates a new client pointed at the public Nominatim instance.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(language: &str, timeout_secs: u64) -> Result<Self, GeocodeError> {
        Self::with_base_url(language, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GeocodeError::InvalidBaseUrl`] if
    /// `base_url` does not parse as an absolute URL.
    pub fn with_base_url(
        language: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, GeocodeError> {
        // Nominatim's usage policy requires an identifying user-agent.
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
            base_url,
            language: language.to_owned(),
        })
    }

    /// Forward-geocodes `query`, returning at most `limit` candidates.
    /// Failures are logged and absorbed into an empty list.
    pub async fn forward(&self, query: &str, limit: usize) -> Vec<Candidate> {
        match self.try_forward(query, limit).await {
            Ok(candidates) => candidates,
            Err(error) => {
                tracing::warn!(query, %error, "nominatim forward geocode failed; treating as no results");
                Vec::new()
            }
        }
    }

    /// Reverse-geocodes a coordinate pair. Failures are logged and absorbed
    /// into an empty [`AddressFields`].
    pub async fn reverse(&self, lat: f64, lng: f64) -> AddressFields {
        match self.try_reverse(lat, lng).await {
            Ok(fields) => fields,
            Err(error) => {
                tracing::warn!(lat, lng, %error, "nominatim reverse geocode failed; treating as no result");
                AddressFields::default()
            }
        }
    }

    /// Fallible variant of [`NominatimClient::forward`].
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
        let mut url = self.endpoint_url("search");
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            pairs.append_pair("format", "json");
            pairs.append_pair("addressdetails", "1");
            pairs.append_pair("limit", &limit.to_string());
            pairs.append_pair("accept-language", &self.language);
        }

        let body = self.request_json(&url).await?;
        let places: Vec<Place> =
            serde_json::from_value(body).map_err(|e| GeocodeError::Deserialize {
                context: format!("nominatim search(q={query})"),
                source: e,
            })?;

        Ok(places
            .into_iter()
            .enumerate()
            .filter_map(|(index, place)| place_to_candidate(place, index))
            .take(limit)
            .collect())
    }

    /// Fallible variant of [`NominatimClient::reverse`].
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::Http`] on network failure or non-2xx HTTP status.
    /// - [`GeocodeError::Deserialize`] if the response shape is unexpected.
    pub async fn try_reverse(&self, lat: f64, lng: f64) -> Result<AddressFields, GeocodeError> {
        let mut url = self.endpoint_url("reverse");
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("lat", &lat.to_string());
            pairs.append_pair("lon", &lng.to_string());
            pairs.append_pair("format", "json");
            pairs.append_pair("addressdetails", "1");
            pairs.append_pair("accept-language", &self.language);
        }

        let body = self.request_json(&url).await?;
        // Nominatim reports "nothing here" as `{"error": "..."}` with HTTP 200;
        // that is a no-result, not a failure.
        if body.get("error").is_some() {
            return Ok(AddressFields::default());
        }
        let place: Place = serde_json::from_value(body).map_err(|e| GeocodeError::Deserialize {
            context: format!("nominatim reverse({lat},{lng})"),
            source: e,
        })?;

        Ok(place_to_address(place))
    }

    fn endpoint_url(&self, endpoint: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(endpoint);
        }
        url
    }

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

/// One result object from `/search` (also the `/reverse` response body).
/// Nominatim serializes coordinates as strings.
#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    place_id: Option<i64>,
    #[serde(default)]
    lat: String,
    #[serde(default)]
    lon: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    address: Option<PlaceAddress>,
}

/// The `address` detail object. The locality lives under a different key
/// depending on the OSM place type, hence the city/town/village/county spread.
#[derive(Debug, Default, Deserialize)]
struct PlaceAddress {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    town: Option<String>,
    #[serde(default)]
    village: Option<String>,
    #[serde(default)]
    county: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    postcode: Option<String>,
}

impl PlaceAddress {
    fn city(&self) -> String {
        self.city
            .clone()
            .or_else(|| self.town.clone())
            .or_else(|| self.village.clone())
            .or_else(|| self.county.clone())
            .unwrap_or_default()
    }

    fn state(&self) -> String {
        self.state
            .clone()
            .or_else(|| self.region.clone())
            .unwrap_or_default()
    }

    fn postcode(&self) -> String {
        self.postcode.clone().unwrap_or_default()
    }
}

fn place_to_candidate(place: Place, index: usize) -> Option<Candidate> {
    let (Ok(lat), Ok(lng)) = (place.lat.parse::<f64>(), place.lon.parse::<f64>()) else {
        tracing::warn!(?place.place_id, "nominatim place has unparseable coordinates; dropping");
        return None;
    };
    if !coordinates_valid(lat, lng) {
        tracing::warn!(?place.place_id, lat, lng, "nominatim place has non-finite coordinates; dropping");
        return None;
    }
    if place.display_name.trim().is_empty() {
        return None;
    }

    let address = place.address.unwrap_or_default();
    let external_id = place.place_id.map(|id| id.to_string());
    Some(Candidate {
        id: synthesize_id(Provider::Nominatim, external_id.as_deref(), lat, lng, index),
        label: place.display_name.clone(),
        lat,
        lng,
        extra: AddressFields {
            address: place.display_name,
            city: address.city(),
            state: address.state(),
            postcode: address.postcode(),
        },
        provider: Provider::Nominatim,
    })
}

fn place_to_address(place: Place) -> AddressFields {
    let address = place.address.unwrap_or_default();
    AddressFields {
        address: place.display_name,
        city: address.city(),
        state: address.state(),
        postcode: address.postcode(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

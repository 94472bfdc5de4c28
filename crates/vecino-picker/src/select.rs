//! Turns any selection gesture — a chosen suggestion, a map click, a device
//! position fix, a saved community marker, or the explicit search button —
//! into the one canonical payload shape handed to the caller.
//!
//! The three provider cascades here (reverse geocoding, immediate search,
//! and the typeahead merge order in `suggest`) share adapters but keep their
//! own ordering rules on purpose; see DESIGN.md.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;
use vecino_geocode::{AddressFields, Candidate, Providers};

use crate::query::{matches_house_number, Query};

/// How long a device position fix may take before giving up.
pub const GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(15);
/// How old a cached fix may be and still be accepted.
pub const GEOLOCATION_MAX_AGE: Duration = Duration::from_secs(60);

/// The single canonical output shape emitted from every selection path.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionPayload {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    /// Set only when the selection came from a saved community marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_id: Option<String>,
}

/// A location record already known to the application (a community marker),
/// selected without any provider call.
#[derive(Debug, Clone, Serialize)]
pub struct SavedLocation {
    pub community_id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
}

/// The one failure category surfaced to the user: the device could not
/// produce a position. Everything provider-side degrades to empty data
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationError {
    /// The platform offers no geolocation capability.
    #[error("geolocation is not supported on this device")]
    Unsupported,
    /// The user refused the permission prompt.
    #[error("geolocation permission was denied")]
    Denied,
    /// The device could not produce a fix in time.
    #[error("current position is unavailable")]
    Unavailable,
    /// Another position request is still in flight; this one was a no-op.
    #[error("a position request is already in progress")]
    AlreadyInProgress,
}

/// Options forwarded to the device position source.
#[derive(Debug, Clone, Copy)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    pub max_age: Duration,
}

/// A device position fix.
#[derive(Debug, Clone, Copy)]
pub struct PositionFix {
    pub lat: f64,
    pub lng: f64,
}

/// Seam over the platform's geolocation capability, so the engine stays
/// testable and host-agnostic.
pub trait PositionSource: Send + Sync {
    fn current_position(
        &self,
        options: PositionOptions,
    ) -> BoxFuture<'_, Result<PositionFix, GeolocationError>>;
}

/// Outcome of the explicit "search now" action.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Found(SelectionPayload),
    /// Both providers answered and neither had a match.
    NoResults,
    /// Every attempted provider call failed outright.
    Failed,
    /// A previous search is still in flight; this one was a no-op.
    AlreadyInFlight,
}

/// Resolves selections into [`SelectionPayload`]s. One instance per picker
/// control; the single-flight flags are instance state, not globals.
pub struct SelectionResolver {
    providers: Arc<Providers>,
    position_source: Option<Arc<dyn PositionSource>>,
    locating: AtomicBool,
    searching: AtomicBool,
}

impl SelectionResolver {
    #[must_use]
    pub fn new(providers: Arc<Providers>, position_source: Option<Arc<dyn PositionSource>>) -> Self {
        Self {
            providers,
            position_source,
            locating: AtomicBool::new(false),
            searching: AtomicBool::new(false),
        }
    }

    /// Maps a chosen suggestion straight into a payload. No I/O.
    #[must_use]
    pub fn select_from_suggestion(&self, candidate: &Candidate) -> SelectionPayload {
        let address = if candidate.extra.address.is_empty() {
            candidate.label.clone()
        } else {
            candidate.extra.address.clone()
        };
        SelectionPayload {
            lat: candidate.lat,
            lng: candidate.lng,
            address,
            city: candidate.extra.city.clone(),
            state: candidate.extra.state.clone(),
            postcode: candidate.extra.postcode.clone(),
            community_id: None,
        }
    }

    /// Resolves a map click through the reverse-geocoding cascade. Never
    /// fails; the worst case is the clicked coordinates with empty address
    /// fields.
    pub async fn select_from_map_click(&self, lat: f64, lng: f64) -> SelectionPayload {
        let fields = self.reverse_cascade(lat, lng).await;
        SelectionPayload {
            lat,
            lng,
            address: fields.address,
            city: fields.city,
            state: fields.state,
            postcode: fields.postcode,
            community_id: None,
        }
    }

    /// Requests a device position fix and resolves it like a map click.
    ///
    /// Single-flight: a second call while one is pending returns
    /// [`GeolocationError::AlreadyInProgress`] without touching the device.
    ///
    /// # Errors
    ///
    /// [`GeolocationError`] when the device cannot produce a position; this
    /// is the engine's only user-surfaced error category.
    pub async fn select_from_geolocation(&self) -> Result<SelectionPayload, GeolocationError> {
        if self.locating.swap(true, Ordering::SeqCst) {
            return Err(GeolocationError::AlreadyInProgress);
        }
        let result = self.locate_once().await;
        self.locating.store(false, Ordering::SeqCst);
        result
    }

    async fn locate_once(&self) -> Result<SelectionPayload, GeolocationError> {
        let Some(source) = &self.position_source else {
            return Err(GeolocationError::Unsupported);
        };
        let options = PositionOptions {
            high_accuracy: true,
            timeout: GEOLOCATION_TIMEOUT,
            max_age: GEOLOCATION_MAX_AGE,
        };
        let fix = source.current_position(options).await?;
        Ok(self.select_from_map_click(fix.lat, fix.lng).await)
    }

    /// Remaps a saved community marker directly; no provider call.
    #[must_use]
    pub fn select_from_saved_location(&self, entry: &SavedLocation) -> SelectionPayload {
        SelectionPayload {
            lat: entry.lat,
            lng: entry.lng,
            address: entry.address.clone(),
            city: entry.city.clone(),
            state: entry.state.clone(),
            postcode: entry.postcode.clone(),
            community_id: Some(entry.community_id.clone()),
        }
    }

    /// The explicit "search now" path: one best result, with a single
    /// cross-fallback to the other provider.
    ///
    /// Provider preference: Mapbox first iff it is configured and the query
    /// has no house number, otherwise Nominatim first. This deliberately
    /// differs from the typeahead merge order.
    pub async fn perform_immediate_search(&self, query: &Query) -> SearchOutcome {
        if self.searching.swap(true, Ordering::SeqCst) {
            return SearchOutcome::AlreadyInFlight;
        }
        let outcome = self.immediate_search_once(query).await;
        self.searching.store(false, Ordering::SeqCst);
        outcome
    }

    async fn immediate_search_once(&self, query: &Query) -> SearchOutcome {
        let mapbox_first = self.providers.mapbox_available() && !query.has_house_number;
        tracing::debug!(
            query = %query.trimmed,
            mapbox_first,
            "running immediate search cascade"
        );

        let mut any_success = false;
        let order = if mapbox_first {
            [SearchLeg::Mapbox, SearchLeg::Nominatim]
        } else {
            [SearchLeg::Nominatim, SearchLeg::Mapbox]
        };

        for leg in order {
            match self.best_result(leg, query).await {
                LegOutcome::Hit(candidate) => {
                    return SearchOutcome::Found(self.finish_immediate(query, &candidate));
                }
                LegOutcome::Empty => any_success = true,
                LegOutcome::Error | LegOutcome::Skipped => {}
            }
        }

        if any_success {
            SearchOutcome::NoResults
        } else {
            SearchOutcome::Failed
        }
    }

    async fn best_result(&self, leg: SearchLeg, query: &Query) -> LegOutcome {
        let attempt = match leg {
            SearchLeg::Mapbox => {
                let Some(client) = &self.providers.mapbox else {
                    return LegOutcome::Skipped;
                };
                client.try_forward(&query.trimmed, 1).await
            }
            SearchLeg::Nominatim => self.providers.nominatim.try_forward(&query.trimmed, 1).await,
        };
        match attempt {
            Ok(candidates) => candidates
                .into_iter()
                .next()
                .map_or(LegOutcome::Empty, LegOutcome::Hit),
            Err(error) => {
                tracing::warn!(?leg, %error, "immediate search leg failed");
                LegOutcome::Error
            }
        }
    }

    /// Builds the payload for a resolved search, overriding the address with
    /// the typed text when the result does not carry the requested house
    /// number. Coordinates always come from the resolved candidate.
    fn finish_immediate(&self, query: &Query, candidate: &Candidate) -> SelectionPayload {
        let mut payload = self.select_from_suggestion(candidate);
        if query.has_house_number {
            let number = query.house_number.as_deref().unwrap_or("");
            let carries_number = matches_house_number(&candidate.label, number)
                || matches_house_number(&candidate.extra.address, number);
            if !carries_number {
                payload.address = query.raw.trim().to_string();
            }
        }
        payload
    }

    /// Mapbox first when configured; Nominatim only when Mapbox produced no
    /// address text.
    async fn reverse_cascade(&self, lat: f64, lng: f64) -> AddressFields {
        if let Some(mapbox) = &self.providers.mapbox {
            let fields = mapbox.reverse(lat, lng).await;
            if !fields.address.is_empty() {
                return fields;
            }
            tracing::debug!(lat, lng, "mapbox reverse gave no address; falling back to nominatim");
        }
        self.providers.nominatim.reverse(lat, lng).await
    }
}

#[derive(Debug, Clone, Copy)]
enum SearchLeg {
    Mapbox,
    Nominatim,
}

enum LegOutcome {
    Hit(Candidate),
    Empty,
    Error,
    Skipped,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use vecino_geocode::{NominatimClient, Provider};

    use super::*;

    fn resolver() -> SelectionResolver {
        let providers = Providers::new(
            None,
            NominatimClient::with_base_url("es", 5, "http://127.0.0.1:9").expect("client"),
        );
        SelectionResolver::new(Arc::new(providers), None)
    }

    fn candidate(label: &str, address: &str) -> Candidate {
        Candidate {
            id: "nominatim:1".to_string(),
            label: label.to_string(),
            lat: -34.6,
            lng: -58.4,
            extra: AddressFields {
                address: address.to_string(),
                city: "Springfield".to_string(),
                state: "Buenos Aires".to_string(),
                postcode: "B1675".to_string(),
            },
            provider: Provider::Nominatim,
        }
    }

    #[test]
    fn suggestion_address_falls_back_to_label() {
        let resolver = resolver();
        let payload = resolver.select_from_suggestion(&candidate("Av. de Mayo 800", ""));
        assert_eq!(payload.address, "Av. de Mayo 800");
        assert_eq!(payload.community_id, None);
    }

    #[test]
    fn suggestion_prefers_structured_address() {
        let resolver = resolver();
        let payload =
            resolver.select_from_suggestion(&candidate("label text", "Av. de Mayo 800"));
        assert_eq!(payload.address, "Av. de Mayo 800");
        assert_eq!(payload.city, "Springfield");
        assert_eq!(payload.postcode, "B1675");
    }

    #[test]
    fn saved_location_carries_community_id_without_io() {
        let resolver = resolver();
        let entry = SavedLocation {
            community_id: "c-77".to_string(),
            name: "Torre Norte".to_string(),
            lat: -34.60,
            lng: -58.38,
            address: "Av. Libertador 1500".to_string(),
            city: "CABA".to_string(),
            state: "Buenos Aires".to_string(),
            postcode: "C1425".to_string(),
        };
        let payload = resolver.select_from_saved_location(&entry);
        assert_eq!(payload.community_id.as_deref(), Some("c-77"));
        assert_eq!(payload.address, "Av. Libertador 1500");
    }

    #[test]
    fn immediate_search_overrides_address_on_number_mismatch() {
        let resolver = resolver();
        let query = Query::parse("Av. Siempre Viva 742");
        let payload = resolver.finish_immediate(&query, &candidate("Av. Siempre Viva 700", ""));
        assert_eq!(payload.address, "Av. Siempre Viva 742");
        assert!((payload.lat - (-34.6)).abs() < f64::EPSILON, "coordinates kept");
    }

    #[test]
    fn immediate_search_keeps_address_when_number_matches() {
        let resolver = resolver();
        let query = Query::parse("Las Flores 100");
        let payload =
            resolver.finish_immediate(&query, &candidate("Las Flores 100, Springfield", ""));
        assert_eq!(payload.address, "Las Flores 100, Springfield");
    }

    #[tokio::test]
    async fn geolocation_without_source_is_unsupported() {
        let resolver = resolver();
        let result = resolver.select_from_geolocation().await;
        assert_eq!(result.unwrap_err(), GeolocationError::Unsupported);
    }

    #[tokio::test]
    async fn single_flight_flag_resets_after_failure() {
        let resolver = resolver();
        assert_eq!(
            resolver.select_from_geolocation().await.unwrap_err(),
            GeolocationError::Unsupported
        );
        // Second attempt must not report AlreadyInProgress.
        assert_eq!(
            resolver.select_from_geolocation().await.unwrap_err(),
            GeolocationError::Unsupported
        );
    }
}

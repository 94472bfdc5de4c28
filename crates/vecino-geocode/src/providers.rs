//! The concrete provider pair handed to the suggestion and selection layers.

use crate::mapbox::MapboxClient;
use crate::nominatim::NominatimClient;

/// Both geocoding backends as one unit.
///
/// `mapbox` is `None` when no access token is configured; every layer above
/// treats that as "the provider does not exist" rather than as a failure, so
/// the engine degrades silently to Nominatim-only operation.
pub struct Providers {
    pub mapbox: Option<MapboxClient>,
    pub nominatim: NominatimClient,
}

impl Providers {
    #[must_use]
    pub fn new(mapbox: Option<MapboxClient>, nominatim: NominatimClient) -> Self {
        Self { mapbox, nominatim }
    }

    /// True when the token-gated provider is configured and will be queried.
    #[must_use]
    pub fn mapbox_available(&self) -> bool {
        self.mapbox.is_some()
    }
}

//! Typed async clients for the two external geocoding services backing the
//! vecino location picker: Mapbox (token-gated, richly structured results)
//! and Nominatim (keyless, always available).
//!
//! Failure policy: the public `forward`/`reverse` surface never errors.
//! Transport failures, non-2xx statuses, and malformed payloads are absorbed
//! at this boundary and logged; callers only ever see an empty result. The
//! `try_*` variants expose the underlying [`GeocodeError`] for callers that
//! need it.

mod error;
mod mapbox;
mod nominatim;
mod providers;
mod types;

pub use error::GeocodeError;
pub use mapbox::MapboxClient;
pub use nominatim::NominatimClient;
pub use providers::Providers;
pub use types::{
    coordinates_valid, microdegrees, synthesize_id, AddressFields, Candidate, Provider,
};

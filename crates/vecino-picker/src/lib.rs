//! Address resolution and suggestion engine for the vecino location picker.
//!
//! Turns partial free-text input into a ranked, deduplicated candidate list
//! drawn from two geocoding providers, keeps that list consistent under
//! rapid overlapping input via a monotonic request token, and converts every
//! selection gesture (suggestion, map click, device position, saved marker,
//! explicit search) into one canonical payload.
//!
//! All provider-side failures degrade to empty data; the only error surfaced
//! to the user is a failed device position fix, because it needs a different
//! user action than a retry.

pub mod config;
pub mod debounce;
pub mod picker;
pub mod query;
pub mod select;
pub mod suggest;

pub use config::{ConfigError, PickerConfig};
pub use debounce::{DebounceScheduler, Phase, PickerState, DEBOUNCE_MS};
pub use picker::{Picker, PickerEvent};
pub use query::Query;
pub use select::{
    GeolocationError, PositionFix, PositionOptions, PositionSource, SavedLocation, SearchOutcome,
    SelectionPayload, SelectionResolver, GEOLOCATION_MAX_AGE, GEOLOCATION_TIMEOUT,
};
pub use suggest::{fetch_suggestions, LIMIT, MIN_CHARS};

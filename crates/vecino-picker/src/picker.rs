//! The per-control facade: wires configuration, providers, the debounce
//! scheduler, and the selection resolver together, and publishes every
//! successful selection on an event channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use vecino_geocode::GeocodeError;

use crate::config::PickerConfig;
use crate::debounce::{DebounceScheduler, PickerState};
use crate::query::Query;
use crate::select::{
    GeolocationError, PositionSource, SavedLocation, SearchOutcome, SelectionPayload,
    SelectionResolver,
};

/// Outbound notifications. Choosing a saved community marker emits both
/// variants: the canonical payload plus the marker echo.
#[derive(Debug, Clone)]
pub enum PickerEvent {
    Selected(SelectionPayload),
    SavedLocationSelected(SavedLocation),
}

/// One location-picker control instance.
pub struct Picker {
    scheduler: DebounceScheduler,
    resolver: SelectionResolver,
    events: UnboundedSender<PickerEvent>,
    notice: &'static str,
}

impl Picker {
    /// Builds a picker from configuration, returning it together with the
    /// receiving end of its event channel.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if a provider client cannot be constructed.
    pub fn new(
        config: &PickerConfig,
        position_source: Option<Arc<dyn PositionSource>>,
    ) -> Result<(Self, UnboundedReceiver<PickerEvent>), GeocodeError> {
        let providers = Arc::new(config.build_providers()?);
        let scheduler = DebounceScheduler::with_debounce(
            Arc::clone(&providers),
            Duration::from_millis(config.debounce_ms),
        );
        let resolver = SelectionResolver::new(providers, position_source);
        let (events, receiver) = unbounded_channel();
        Ok((
            Self {
                scheduler,
                resolver,
                events,
                notice: config.search_mode_notice(),
            },
            receiver,
        ))
    }

    /// Feeds a keystroke's worth of new text into the typeahead.
    pub fn on_input(&mut self, text: &str) {
        self.scheduler.on_input(text);
    }

    /// Current typeahead state (suggestions, loading flag, highlight).
    #[must_use]
    pub fn state(&self) -> PickerState {
        self.scheduler.snapshot()
    }

    /// Moves the keyboard highlight cursor.
    pub fn highlight(&self, index: Option<usize>) {
        self.scheduler.highlight(index);
    }

    /// Escape or blur: close the list without selecting.
    pub fn dismiss(&mut self) {
        self.scheduler.reset();
    }

    /// Confirms the suggestion at `index`, emitting the selection. Returns
    /// `None` when the index no longer points at a suggestion.
    pub fn choose_suggestion(&mut self, index: usize) -> Option<SelectionPayload> {
        let candidate = self.scheduler.snapshot().suggestions.into_iter().nth(index)?;
        let payload = self.resolver.select_from_suggestion(&candidate);
        self.emit(PickerEvent::Selected(payload.clone()));
        self.scheduler.reset();
        Some(payload)
    }

    /// Resolves a map click and emits the selection.
    pub async fn click_map(&mut self, lat: f64, lng: f64) -> SelectionPayload {
        let payload = self.resolver.select_from_map_click(lat, lng).await;
        self.emit(PickerEvent::Selected(payload.clone()));
        self.scheduler.reset();
        payload
    }

    /// Resolves the device position and emits the selection on success.
    ///
    /// # Errors
    ///
    /// [`GeolocationError`] when no position can be produced; nothing is
    /// emitted in that case.
    pub async fn use_my_location(&mut self) -> Result<SelectionPayload, GeolocationError> {
        let payload = self.resolver.select_from_geolocation().await?;
        self.emit(PickerEvent::Selected(payload.clone()));
        self.scheduler.reset();
        Ok(payload)
    }

    /// Confirms a saved community marker: emits the canonical payload and
    /// the marker echo.
    pub fn choose_saved_location(&mut self, entry: &SavedLocation) -> SelectionPayload {
        let payload = self.resolver.select_from_saved_location(entry);
        self.emit(PickerEvent::Selected(payload.clone()));
        self.emit(PickerEvent::SavedLocationSelected(entry.clone()));
        self.scheduler.reset();
        payload
    }

    /// The explicit search-button path. Emits only on a found result.
    pub async fn search_now(&mut self, text: &str) -> SearchOutcome {
        let query = Query::parse(text);
        let outcome = self.resolver.perform_immediate_search(&query).await;
        if let SearchOutcome::Found(payload) = &outcome {
            self.emit(PickerEvent::Selected(payload.clone()));
            self.scheduler.reset();
        }
        outcome
    }

    /// Informational status string describing the active search mode.
    #[must_use]
    pub fn search_mode_notice(&self) -> &'static str {
        self.notice
    }

    fn emit(&self, event: PickerEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.events.send(event);
    }
}

//! Trailing-edge debounce over the suggestion aggregator, plus the request
//! token that keeps overlapping aggregations from clobbering each other.
//!
//! Results are applied in issuance order, not completion order: each
//! scheduled aggregation captures the token value at schedule time and a
//! completion is applied iff that token still equals the current one. A
//! superseded network call is never cancelled, just ignored when it lands.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use vecino_geocode::{Candidate, Providers};

use crate::query::Query;
use crate::suggest::{fetch_suggestions, MIN_CHARS};

/// Quiet time after the last keystroke before an aggregation fires.
pub const DEBOUNCE_MS: u64 = 350;

/// Where the typeahead currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Debouncing,
    Suggesting,
    Suggested,
}

/// UI-visible typeahead state. Replaced wholesale, never merged.
#[derive(Debug, Clone)]
pub struct PickerState {
    pub suggestions: Vec<Candidate>,
    pub loading: bool,
    pub highlighted: Option<usize>,
    pub phase: Phase,
}

impl Default for PickerState {
    fn default() -> Self {
        Self {
            suggestions: Vec::new(),
            loading: false,
            highlighted: None,
            phase: Phase::Idle,
        }
    }
}

/// Per-picker-instance debounce state: the monotonic token, the single
/// pending timer task, and the shared typeahead state.
pub struct DebounceScheduler {
    providers: Arc<Providers>,
    state: Arc<Mutex<PickerState>>,
    current_token: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
    debounce: Duration,
}

impl DebounceScheduler {
    #[must_use]
    pub fn new(providers: Arc<Providers>) -> Self {
        Self::with_debounce(providers, Duration::from_millis(DEBOUNCE_MS))
    }

    /// Like [`DebounceScheduler::new`] with a custom quiet time, so tests do
    /// not have to wait out the production delay.
    #[must_use]
    pub fn with_debounce(providers: Arc<Providers>, debounce: Duration) -> Self {
        Self {
            providers,
            state: Arc::new(Mutex::new(PickerState::default())),
            current_token: Arc::new(AtomicU64::new(0)),
            pending: None,
            debounce,
        }
    }

    /// Reacts to a change of the search text.
    ///
    /// Cancels any pending timer. Short queries clear the list synchronously
    /// without touching the token; anything else claims a fresh token and
    /// schedules an aggregation after the quiet time.
    pub fn on_input(&mut self, text: &str) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }

        let query = Query::parse(text);
        if query.trimmed.chars().count() < MIN_CHARS {
            let mut state = lock_state(&self.state);
            state.suggestions.clear();
            state.loading = false;
            state.highlighted = None;
            state.phase = Phase::Idle;
            return;
        }

        let token = self.current_token.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = lock_state(&self.state);
            state.loading = true;
            state.phase = Phase::Debouncing;
        }

        let providers = Arc::clone(&self.providers);
        let state = Arc::clone(&self.state);
        let current_token = Arc::clone(&self.current_token);
        let debounce = self.debounce;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if current_token.load(Ordering::SeqCst) == token {
                lock_state(&state).phase = Phase::Suggesting;
            }
            let suggestions = fetch_suggestions(&providers, &query).await;
            apply_if_current(&state, &current_token, token, suggestions);
        }));
    }

    /// Exits the typeahead (selection, escape, blur): drops any pending
    /// timer, invalidates in-flight aggregations, and returns to idle.
    pub fn reset(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        self.current_token.fetch_add(1, Ordering::SeqCst);
        let mut state = lock_state(&self.state);
        *state = PickerState::default();
    }

    /// A point-in-time copy of the typeahead state.
    #[must_use]
    pub fn snapshot(&self) -> PickerState {
        lock_state(&self.state).clone()
    }

    /// Moves the keyboard highlight, clamped to the current list.
    pub fn highlight(&self, index: Option<usize>) {
        let mut state = lock_state(&self.state);
        state.highlighted = index.filter(|i| *i < state.suggestions.len());
    }
}

fn lock_state(state: &Mutex<PickerState>) -> std::sync::MutexGuard<'_, PickerState> {
    state.lock().expect("picker state lock poisoned")
}

/// Applies a completed aggregation iff its token is still the current one;
/// a stale completion is discarded without touching any state.
fn apply_if_current(
    state: &Mutex<PickerState>,
    current_token: &AtomicU64,
    token: u64,
    suggestions: Vec<Candidate>,
) {
    if current_token.load(Ordering::SeqCst) != token {
        tracing::debug!(token, "discarding superseded suggestion result");
        return;
    }
    let mut state = lock_state(state);
    state.suggestions = suggestions;
    state.loading = false;
    state.highlighted = None;
    state.phase = Phase::Suggested;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

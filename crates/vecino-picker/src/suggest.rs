//! Suggestion aggregation: fan the query out to both providers, merge with
//! a digit-dependent precedence, deduplicate, and apply the house-number
//! filter with its typed-address fallback.

use std::collections::HashSet;

use vecino_geocode::{microdegrees, AddressFields, Candidate, Providers};

use crate::query::{matches_house_number, Query};

/// Queries shorter than this (after trimming) produce no suggestions and no
/// network traffic.
pub const MIN_CHARS: usize = 3;

/// Maximum length of a suggestion list.
pub const LIMIT: usize = 5;

/// Produces the ranked, deduplicated suggestion list for one query.
///
/// Never errors: a failing provider simply contributes nothing.
pub async fn fetch_suggestions(providers: &Providers, query: &Query) -> Vec<Candidate> {
    if query.trimmed.chars().count() < MIN_CHARS {
        return Vec::new();
    }

    let mapbox_results = async {
        match &providers.mapbox {
            Some(client) => client.forward(&query.trimmed, LIMIT).await,
            None => Vec::new(),
        }
    };
    let nominatim_results = providers.nominatim.forward(&query.trimmed, LIMIT);
    let (mapbox, nominatim) = tokio::join!(mapbox_results, nominatim_results);

    tracing::debug!(
        query = %query.trimmed,
        mapbox = mapbox.len(),
        nominatim = nominatim.len(),
        house_number = query.house_number.as_deref(),
        "aggregating provider results"
    );

    // Nominatim resolves house-numbered addresses more literally, so it takes
    // precedence in the dedup pass when the query carries a number; Mapbox
    // wins for coarse place-name queries.
    let merged = if query.has_house_number {
        dedup_in_order(nominatim, mapbox)
    } else {
        dedup_in_order(mapbox, nominatim)
    };

    if !query.has_house_number {
        return merged.into_iter().take(LIMIT).collect();
    }

    // A digit with no extractable number token filters everything out, which
    // lands in the typed-address fallback below.
    let house_number = query.house_number.as_deref().unwrap_or("");
    let filtered: Vec<Candidate> = merged
        .iter()
        .filter(|c| {
            matches_house_number(&c.label, house_number)
                || matches_house_number(&c.extra.address, house_number)
        })
        .cloned()
        .collect();

    if !filtered.is_empty() {
        return filtered.into_iter().take(LIMIT).collect();
    }

    // No provider result carries the requested number: lead with a candidate
    // built from the typed text itself, anchored to the best result's
    // coordinates and locality.
    let Some(fallback) = synthesize_typed_candidate(query, merged.first()) else {
        return Vec::new();
    };
    tracing::debug!(query = %query.trimmed, "no candidate matched house number; synthesizing typed-address fallback");
    std::iter::once(fallback)
        .chain(merged)
        .take(LIMIT)
        .collect()
}

/// Concatenates the two lists in precedence order and keeps only the first
/// occurrence of each dedup key.
fn dedup_in_order(first: Vec<Candidate>, second: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    first
        .into_iter()
        .chain(second)
        .filter(|candidate| seen.insert(candidate.dedup_key()))
        .collect()
}

/// Builds the typed-address fallback candidate from the raw query and the
/// geographic context of `anchor`. Returns `None` when there is no anchor to
/// borrow coordinates from.
fn synthesize_typed_candidate(query: &Query, anchor: Option<&Candidate>) -> Option<Candidate> {
    let anchor = anchor?;
    let raw = query.raw.trim();

    let context: Vec<&str> = [anchor.extra.city.as_str(), anchor.extra.state.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
    let label = if context.is_empty() {
        raw.to_string()
    } else {
        format!("{raw}, {}", context.join(", "))
    };

    Some(Candidate {
        id: format!(
            "typed:{}:{}",
            microdegrees(anchor.lat),
            microdegrees(anchor.lng)
        ),
        label,
        lat: anchor.lat,
        lng: anchor.lng,
        extra: AddressFields {
            address: raw.to_string(),
            city: anchor.extra.city.clone(),
            state: anchor.extra.state.clone(),
            postcode: String::new(),
        },
        provider: anchor.provider,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Environment-driven configuration for one picker instance.
//!
//! The Mapbox token is the only credential; when it is absent the engine
//! silently degrades to Nominatim-only operation — that is a supported mode,
//! surfaced as an informational notice rather than an error.

use thiserror::Error;
use vecino_geocode::{GeocodeError, MapboxClient, NominatimClient, Providers};

use crate::debounce::DEBOUNCE_MS;

/// Configuration parsing failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Clone)]
pub struct PickerConfig {
    pub mapbox_token: Option<String>,
    pub language: String,
    pub request_timeout_secs: u64,
    pub debounce_ms: u64,
    /// Overridable for tests and self-hosted provider instances.
    pub mapbox_base_url: Option<String>,
    pub nominatim_base_url: Option<String>,
}

impl std::fmt::Debug for PickerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickerConfig")
            .field(
                "mapbox_token",
                &self.mapbox_token.as_ref().map(|_| "[redacted]"),
            )
            .field("language", &self.language)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("debounce_ms", &self.debounce_ms)
            .field("mapbox_base_url", &self.mapbox_base_url)
            .field("nominatim_base_url", &self.nominatim_base_url)
            .finish()
    }
}

impl PickerConfig {
    /// Loads configuration from the environment, reading `.env` first.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a present env var fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        build_config(|key| std::env::var(key))
    }

    /// Informational status for the UI: which search mode is active.
    #[must_use]
    pub fn search_mode_notice(&self) -> &'static str {
        if self.mapbox_token.is_some() {
            "full address search enabled"
        } else {
            "address search limited to the community provider"
        }
    }

    /// Builds the provider pair this configuration describes.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if an HTTP client cannot be constructed or a
    /// base URL override is invalid.
    pub fn build_providers(&self) -> Result<Providers, GeocodeError> {
        let mapbox = match &self.mapbox_token {
            Some(token) => Some(match &self.mapbox_base_url {
                Some(base) => MapboxClient::with_base_url(
                    token,
                    &self.language,
                    self.request_timeout_secs,
                    base,
                )?,
                None => MapboxClient::new(token, &self.language, self.request_timeout_secs)?,
            }),
            None => None,
        };

        let nominatim = match &self.nominatim_base_url {
            Some(base) => {
                NominatimClient::with_base_url(&self.language, self.request_timeout_secs, base)?
            }
            None => NominatimClient::new(&self.language, self.request_timeout_secs)?,
        };

        Ok(Providers::new(mapbox, nominatim))
    }
}

/// Builds the configuration from the provided env-var lookup, decoupled from
/// the real environment so tests can use a plain `HashMap`.
fn build_config<F>(lookup: F) -> Result<PickerConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default =
        |var: &str, default: &str| lookup(var).unwrap_or_else(|_| default.to_string());

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let mapbox_token = lookup("VECINO_MAPBOX_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());
    let language = or_default("VECINO_LANGUAGE", "es");
    let request_timeout_secs = parse_u64("VECINO_GEOCODE_TIMEOUT_SECS", "10")?;
    let debounce_ms = parse_u64("VECINO_DEBOUNCE_MS", &DEBOUNCE_MS.to_string())?;
    let mapbox_base_url = lookup("VECINO_MAPBOX_BASE_URL").ok();
    let nominatim_base_url = lookup("VECINO_NOMINATIM_BASE_URL").ok();

    Ok(PickerConfig {
        mapbox_token,
        language,
        request_timeout_secs,
        debounce_ms,
        mapbox_base_url,
        nominatim_base_url,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn defaults_apply_with_empty_environment() {
        let map = HashMap::new();
        let config = build_config(lookup_from_map(&map)).expect("config should build");
        assert_eq!(config.mapbox_token, None);
        assert_eq!(config.language, "es");
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.debounce_ms, 350);
    }

    #[test]
    fn blank_token_counts_as_absent() {
        let mut map = HashMap::new();
        map.insert("VECINO_MAPBOX_TOKEN", "   ");
        let config = build_config(lookup_from_map(&map)).expect("config should build");
        assert_eq!(config.mapbox_token, None);
        assert_eq!(
            config.search_mode_notice(),
            "address search limited to the community provider"
        );
    }

    #[test]
    fn token_enables_full_search_notice() {
        let mut map = HashMap::new();
        map.insert("VECINO_MAPBOX_TOKEN", "pk.test");
        let config = build_config(lookup_from_map(&map)).expect("config should build");
        assert_eq!(config.mapbox_token.as_deref(), Some("pk.test"));
        assert_eq!(config.search_mode_notice(), "full address search enabled");
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let mut map = HashMap::new();
        map.insert("VECINO_GEOCODE_TIMEOUT_SECS", "soon");
        let result = build_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "VECINO_GEOCODE_TIMEOUT_SECS"),
            "expected InvalidEnvVar, got: {result:?}"
        );
    }

    #[test]
    fn debug_redacts_the_token() {
        let mut map = HashMap::new();
        map.insert("VECINO_MAPBOX_TOKEN", "pk.secret");
        let config = build_config(lookup_from_map(&map)).expect("config should build");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("pk.secret"));
        assert!(rendered.contains("[redacted]"));
    }
}

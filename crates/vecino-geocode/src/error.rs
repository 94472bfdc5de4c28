use thiserror::Error;

/// Errors produced by the geocoding provider clients.
///
/// These never escape the crate's public `forward`/`reverse` methods, which
/// absorb every failure into an empty result. The fallible `try_*` variants
/// expose them for callers that want to distinguish failure from no-results.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Network or TLS failure from the underlying HTTP client, or a non-2xx
    /// HTTP status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The configured base URL could not be parsed.
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),
}

use thiserror::Error;

/// Invalid geocoder configuration.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum NominatimConfigError {
    /// The service base URL is blank.
    #[error("geocoder base URL must not be empty")]
    EmptyBaseUrl,
    /// The service base URL is not an absolute URL.
    #[error("geocoder base URL `{url}` is invalid: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// The service base URL does not use HTTP(S).
    #[error("geocoder base URL `{url}` must use http or https")]
    UnsupportedScheme { url: String },
    /// Nominatim's usage policy requires an identifying user agent.
    #[error("geocoder user agent must not be empty")]
    EmptyUserAgent,
}

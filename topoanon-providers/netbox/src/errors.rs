use thiserror::Error;

/// Invalid NetBox source configuration.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum NetboxConfigError {
    /// The API base URL is blank.
    #[error("NetBox base URL must not be empty")]
    EmptyBaseUrl,
    /// The API base URL is not an absolute URL.
    #[error("NetBox base URL `{url}` is invalid: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// The API base URL does not use HTTP(S).
    #[error("NetBox base URL `{url}` must use http or https")]
    UnsupportedScheme { url: String },
    /// The page size is zero.
    #[error("page size must be greater than zero")]
    ZeroPageSize,
    /// The snapshot directory cannot be opened.
    #[error("snapshot directory `{path}` cannot be opened: {message}")]
    SnapshotDirectory { path: String, message: String },
}

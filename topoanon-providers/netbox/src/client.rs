//! Paginated NetBox REST client.

use std::{collections::HashSet, fmt, num::NonZeroUsize, time::Duration};

use serde_json::Value;
use topoanon_core::{InventorySource, InventorySourceError, RecordKind};
use tracing::{debug, instrument, warn};
use ureq::Agent;
use url::Url;

use crate::{errors::NetboxConfigError, page::decode_page};

/// Records requested per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// API path of each record category, relative to the API root.
///
/// # Examples
/// ```
/// use topoanon_core::RecordKind;
/// use topoanon_providers_netbox::endpoint_path;
///
/// assert_eq!(endpoint_path(RecordKind::Circuit), "circuits/circuits/");
/// ```
#[must_use]
pub const fn endpoint_path(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Device => "dcim/devices/",
        RecordKind::Cable => "dcim/cables/",
        RecordKind::Site => "dcim/sites/",
        RecordKind::Circuit => "circuits/circuits/",
    }
}

/// A request target plus the headers to send with it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetboxEndpoint {
    /// Absolute URL of the page.
    pub url: String,
    /// `Authorization` header value.
    pub authorization: String,
}

/// Fetches raw page bodies.
pub trait HttpTransport {
    /// Performs a GET request and returns the response body.
    ///
    /// # Errors
    /// Returns [`InventorySourceError::Transport`] when no response arrives
    /// and [`InventorySourceError::Status`] for non-success statuses.
    fn get(&self, endpoint: &NetboxEndpoint) -> Result<Vec<u8>, InventorySourceError>;
}

/// [`HttpTransport`] backed by a blocking `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("timeout", &REQUEST_TIMEOUT)
            .finish_non_exhaustive()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, endpoint: &NetboxEndpoint) -> Result<Vec<u8>, InventorySourceError> {
        let transport_error = |message: String| InventorySourceError::Transport {
            url: endpoint.url.clone(),
            message,
        };
        let mut response = self
            .agent
            .get(&endpoint.url)
            .header("Authorization", &endpoint.authorization)
            .header("Accept", "application/json")
            .call()
            .map_err(|error| match error {
                ureq::Error::StatusCode(status) => InventorySourceError::Status {
                    url: endpoint.url.clone(),
                    status,
                },
                other => transport_error(other.to_string()),
            })?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|error| transport_error(error.to_string()))
    }
}

/// Reads every record category from a NetBox API.
///
/// # Examples
/// ```
/// use topoanon_providers_netbox::NetboxClient;
///
/// let client = NetboxClient::new("https://netbox.example.org/api", "secret")?;
/// assert_eq!(client.base_url(), "https://netbox.example.org/api/");
/// # Ok::<(), topoanon_providers_netbox::NetboxConfigError>(())
/// ```
#[derive(Clone, Debug)]
pub struct NetboxClient<T = UreqTransport> {
    base_url: Url,
    token: String,
    page_size: NonZeroUsize,
    transport: T,
}

impl NetboxClient<UreqTransport> {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    /// Returns [`NetboxConfigError`] when `base_url` is blank, unparsable or
    /// not HTTP(S).
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, NetboxConfigError> {
        Self::with_transport(base_url, token, UreqTransport::default())
    }
}

impl<T: HttpTransport> NetboxClient<T> {
    /// Creates a client that issues requests through `transport`.
    ///
    /// An empty token is accepted with a warning, since some deployments
    /// allow anonymous reads.
    ///
    /// # Errors
    /// Returns [`NetboxConfigError`] when `base_url` is blank, unparsable or
    /// not HTTP(S).
    pub fn with_transport(
        base_url: impl Into<String>,
        token: impl Into<String>,
        transport: T,
    ) -> Result<Self, NetboxConfigError> {
        let root = api_root(base_url.into().trim())?;
        let token = token.into();
        if token.trim().is_empty() {
            warn!(base_url = %root, "NetBox token is empty, requests are unauthenticated");
        }
        Ok(Self {
            base_url: root,
            token,
            page_size: DEFAULT_PAGE_SIZE,
            transport,
        })
    }

    /// Overrides how many records are requested per page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: NonZeroUsize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Returns the normalized API root, always ending in `/`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Returns the configured page size.
    #[must_use]
    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    /// Returns the URL of the first page of `kind`.
    ///
    /// # Errors
    /// Returns [`InventorySourceError::Transport`] when the category path
    /// cannot be joined onto the API root.
    pub fn first_page_url(&self, kind: RecordKind) -> Result<Url, InventorySourceError> {
        let mut url = self.base_url.join(endpoint_path(kind)).map_err(|error| {
            InventorySourceError::Transport {
                url: self.base_url.to_string(),
                message: error.to_string(),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("limit", &self.page_size.to_string());
        Ok(url)
    }

    fn endpoint(&self, url: String) -> NetboxEndpoint {
        NetboxEndpoint {
            url,
            authorization: format!("Token {}", self.token),
        }
    }
}

fn api_root(raw: &str) -> Result<Url, NetboxConfigError> {
    if raw.is_empty() {
        return Err(NetboxConfigError::EmptyBaseUrl);
    }
    let mut root = Url::parse(raw).map_err(|source| NetboxConfigError::InvalidBaseUrl {
        url: raw.to_owned(),
        source,
    })?;
    if !matches!(root.scheme(), "http" | "https") {
        return Err(NetboxConfigError::UnsupportedScheme {
            url: raw.to_owned(),
        });
    }
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    Ok(root)
}

impl<T: HttpTransport> InventorySource for NetboxClient<T> {
    fn name(&self) -> &str {
        self.base_url.as_str()
    }

    /// Follows `next` links until the last page; any failing page fails the
    /// whole category.
    #[instrument(
        name = "netbox.fetch",
        skip(self),
        fields(category = kind.category(), pages = tracing::field::Empty),
        err
    )]
    fn fetch(&self, kind: RecordKind) -> Result<Vec<Value>, InventorySourceError> {
        let mut records = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(String::from(self.first_page_url(kind)?));
        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                warn!(url = %url, "pagination loops back to a visited page, stopping");
                break;
            }
            let endpoint = self.endpoint(url);
            let body = self.transport.get(&endpoint)?;
            let page = decode_page(&endpoint.url, &body)?;
            debug!(url = %endpoint.url, records = page.results.len(), "fetched page");
            records.extend(page.results);
            next = page.next.filter(|link| !link.is_empty());
        }
        tracing::Span::current().record("pages", visited.len());
        Ok(records)
    }
}

//! The [`Geocoder`] implementation and its HTTP transport.

use std::{fmt, thread, time::Duration};

use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
};
use topoanon_core::{Coordinates, GeocodeError, GeocodedPlace, Geocoder, PlaceComponents};
use tracing::{debug, instrument};
use ureq::Agent;
use url::Url;

use crate::{
    errors::NominatimConfigError,
    query::{REVERSE_PATH, SEARCH_PATH, reverse_url, search_url},
    response::{decode_reverse, decode_search},
};

type RequestLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Public OpenStreetMap Nominatim instance.
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org/";

/// User agent sent unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = concat!("topoanon/", env!("CARGO_PKG_VERSION"));

/// The public instance allows one request per second.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches raw geocoder answers.
pub trait GeocodeTransport {
    /// Performs a GET request identified by `user_agent`.
    ///
    /// # Errors
    /// Returns [`GeocodeError::Transport`] when no response arrives and
    /// [`GeocodeError::Status`] for non-success statuses.
    fn get(&self, url: &str, user_agent: &str) -> Result<Vec<u8>, GeocodeError>;
}

/// [`GeocodeTransport`] backed by a blocking `ureq` agent.
#[derive(Clone)]
pub struct UreqGeocodeTransport {
    agent: Agent,
}

impl fmt::Debug for UreqGeocodeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqGeocodeTransport")
            .field("timeout", &REQUEST_TIMEOUT)
            .finish_non_exhaustive()
    }
}

impl Default for UreqGeocodeTransport {
    fn default() -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl GeocodeTransport for UreqGeocodeTransport {
    fn get(&self, url: &str, user_agent: &str) -> Result<Vec<u8>, GeocodeError> {
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", user_agent)
            .header("Accept", "application/json")
            .call()
            .map_err(|error| match error {
                ureq::Error::StatusCode(status) => GeocodeError::Status { status },
                other => GeocodeError::Transport {
                    message: other.to_string(),
                },
            })?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|error| GeocodeError::Transport {
                message: error.to_string(),
            })
    }
}

/// Geocoder for the Nominatim `search` and `reverse` endpoints.
///
/// Consecutive requests are spaced by at least the configured minimum
/// interval; the calling thread sleeps when needed.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use topoanon_providers_nominatim::NominatimGeocoder;
///
/// let geocoder = NominatimGeocoder::new("https://geo.example.org", "inventory-export/1.0")?
///     .with_min_interval(Duration::ZERO);
/// assert_eq!(geocoder.base_url(), "https://geo.example.org/");
/// # Ok::<(), topoanon_providers_nominatim::NominatimConfigError>(())
/// ```
pub struct NominatimGeocoder<T = UreqGeocodeTransport> {
    base_url: Url,
    search_endpoint: Url,
    reverse_endpoint: Url,
    user_agent: String,
    min_interval: Duration,
    limiter: Option<RequestLimiter>,
    clock: DefaultClock,
    transport: T,
}

impl<T: fmt::Debug> fmt::Debug for NominatimGeocoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NominatimGeocoder")
            .field("base_url", &self.base_url.as_str())
            .field("user_agent", &self.user_agent)
            .field("min_interval", &self.min_interval)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl NominatimGeocoder<UreqGeocodeTransport> {
    /// Creates a geocoder for the service at `base_url`.
    ///
    /// # Errors
    /// Returns [`NominatimConfigError`] when the URL is blank, unparsable or
    /// not HTTP(S), or when `user_agent` is blank.
    pub fn new(
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Result<Self, NominatimConfigError> {
        Self::with_transport(base_url, user_agent, UreqGeocodeTransport::default())
    }
}

impl<T: GeocodeTransport> NominatimGeocoder<T> {
    /// Creates a geocoder issuing requests through `transport`.
    ///
    /// # Errors
    /// Returns [`NominatimConfigError`] when the URL is blank, unparsable or
    /// not HTTP(S), or when `user_agent` is blank.
    pub fn with_transport(
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
        transport: T,
    ) -> Result<Self, NominatimConfigError> {
        let root = service_root(base_url.into().trim())?;
        let endpoint = |path: &str| {
            root.join(path)
                .map_err(|source| NominatimConfigError::InvalidBaseUrl {
                    url: root.to_string(),
                    source,
                })
        };
        let search_endpoint = endpoint(SEARCH_PATH)?;
        let reverse_endpoint = endpoint(REVERSE_PATH)?;
        let user_agent = user_agent.into();
        if user_agent.trim().is_empty() {
            return Err(NominatimConfigError::EmptyUserAgent);
        }
        Ok(Self {
            base_url: root,
            search_endpoint,
            reverse_endpoint,
            user_agent,
            min_interval: DEFAULT_MIN_INTERVAL,
            limiter: request_limiter(DEFAULT_MIN_INTERVAL),
            clock: DefaultClock::default(),
            transport,
        })
    }

    /// Overrides the minimum spacing between requests. A zero interval
    /// disables throttling.
    #[must_use]
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self.limiter = request_limiter(min_interval);
        self
    }

    /// Returns the normalized service root, always ending in `/`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Returns the user agent sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn throttled_get(&self, url: &Url) -> Result<Vec<u8>, GeocodeError> {
        if let Some(limiter) = &self.limiter {
            while let Err(not_until) = limiter.check() {
                let wait = not_until.wait_time_from(self.clock.now());
                debug!(wait_ms = wait.as_millis(), "throttling geocoder request");
                thread::sleep(wait);
            }
        }
        self.transport.get(url.as_str(), &self.user_agent)
    }
}

fn service_root(raw: &str) -> Result<Url, NominatimConfigError> {
    if raw.is_empty() {
        return Err(NominatimConfigError::EmptyBaseUrl);
    }
    let mut root = Url::parse(raw).map_err(|source| NominatimConfigError::InvalidBaseUrl {
        url: raw.to_owned(),
        source,
    })?;
    if !matches!(root.scheme(), "http" | "https") {
        return Err(NominatimConfigError::UnsupportedScheme {
            url: raw.to_owned(),
        });
    }
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    Ok(root)
}

fn request_limiter(min_interval: Duration) -> Option<RequestLimiter> {
    Quota::with_period(min_interval).map(RequestLimiter::direct)
}

impl<T: GeocodeTransport> Geocoder for NominatimGeocoder<T> {
    #[instrument(name = "nominatim.search", skip(self), err)]
    fn geocode(&self, query: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
        let body = self.throttled_get(&search_url(&self.search_endpoint, query))?;
        decode_search(&body)
    }

    #[instrument(
        name = "nominatim.reverse",
        skip(self, at),
        fields(latitude = at.latitude, longitude = at.longitude),
        err
    )]
    fn reverse(&self, at: Coordinates) -> Result<Option<PlaceComponents>, GeocodeError> {
        let body = self.throttled_get(&reverse_url(&self.reverse_endpoint, at))?;
        decode_reverse(&body)
    }
}

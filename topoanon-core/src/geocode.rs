//! Geocoding boundary and the per-run memoizing resolver.
//!
//! A [`Geocoder`] talks to an external provider. The [`GeocodeResolver`]
//! wraps it with two caches (free text to place, coordinates to generalized
//! place) that remember every outcome, failures included, for the lifetime of
//! one run.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::GeocodeError;

/// A latitude/longitude pair in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Coordinates {
    /// The terminal fallback used when nothing else resolves.
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    /// Creates a coordinate pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Pairs optional components, yielding `None` unless both are present.
    #[must_use]
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        Some(Self::new(latitude?, longitude?))
    }

    fn cache_key(self) -> (u64, u64) {
        (self.latitude.to_bits(), self.longitude.to_bits())
    }
}

/// Result of a forward lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct GeocodedPlace {
    /// Coordinates of the best match.
    pub coordinates: Coordinates,
    /// City (or town) of the best match, when the provider reports one.
    pub city: Option<String>,
}

/// Address components returned by a reverse lookup.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PlaceComponents {
    /// City, town or village.
    pub city: Option<String>,
    /// State or region.
    pub state: Option<String>,
    /// Country.
    pub country: Option<String>,
}

impl PlaceComponents {
    /// Joins the non-empty components as `city, state, country`.
    ///
    /// # Examples
    /// ```
    /// use topoanon_core::PlaceComponents;
    ///
    /// let place = PlaceComponents {
    ///     city: None,
    ///     state: Some("Noord-Holland".into()),
    ///     country: Some("Netherlands".into()),
    /// };
    /// assert_eq!(place.generalized().as_deref(), Some("Noord-Holland, Netherlands"));
    /// assert_eq!(PlaceComponents::default().generalized(), None);
    /// ```
    #[must_use]
    pub fn generalized(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.city, &self.state, &self.country]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// External geocoding provider.
pub trait Geocoder {
    /// Turns free text into coordinates. `Ok(None)` means "no match".
    ///
    /// # Errors
    /// Returns [`GeocodeError`] when the provider cannot be reached or its
    /// answer cannot be decoded.
    fn geocode(&self, query: &str) -> Result<Option<GeocodedPlace>, GeocodeError>;

    /// Turns coordinates into address components. `Ok(None)` means "no match".
    ///
    /// # Errors
    /// Returns [`GeocodeError`] when the provider cannot be reached or its
    /// answer cannot be decoded.
    fn reverse(&self, at: Coordinates) -> Result<Option<PlaceComponents>, GeocodeError>;
}

impl<G: Geocoder + ?Sized> Geocoder for &G {
    fn geocode(&self, query: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
        (**self).geocode(query)
    }

    fn reverse(&self, at: Coordinates) -> Result<Option<PlaceComponents>, GeocodeError> {
        (**self).reverse(at)
    }
}

impl<G: Geocoder + ?Sized> Geocoder for Box<G> {
    fn geocode(&self, query: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
        (**self).geocode(query)
    }

    fn reverse(&self, at: Coordinates) -> Result<Option<PlaceComponents>, GeocodeError> {
        (**self).reverse(at)
    }
}

/// A [`Geocoder`] for offline runs: every lookup answers "no match".
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledGeocoder;

impl Geocoder for DisabledGeocoder {
    fn geocode(&self, _query: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
        Ok(None)
    }

    fn reverse(&self, _at: Coordinates) -> Result<Option<PlaceComponents>, GeocodeError> {
        Ok(None)
    }
}

/// Memoizing front for a [`Geocoder`].
///
/// Both caches are consulted before the provider and record every outcome,
/// so the provider sees each distinct input at most once per run.
///
/// # Examples
/// ```
/// use topoanon_core::{DisabledGeocoder, GeocodeResolver};
///
/// let mut resolver = GeocodeResolver::new(DisabledGeocoder);
/// assert_eq!(resolver.geocode_text("Science Park 140, Amsterdam"), None);
/// assert_eq!(resolver.geocode_text("Science Park 140, Amsterdam"), None);
/// assert_eq!(resolver.provider_calls(), 1);
/// ```
#[derive(Debug)]
pub struct GeocodeResolver<G> {
    geocoder: G,
    forward: HashMap<String, Option<GeocodedPlace>>,
    reverse: HashMap<(u64, u64), Option<String>>,
    provider_calls: usize,
}

impl<G: Geocoder> GeocodeResolver<G> {
    /// Wraps `geocoder` with empty caches.
    #[must_use]
    pub fn new(geocoder: G) -> Self {
        Self {
            geocoder,
            forward: HashMap::new(),
            reverse: HashMap::new(),
            provider_calls: 0,
        }
    }

    /// Resolves free text to a place, consulting the cache first.
    ///
    /// Provider failures are logged and cached as "no result".
    pub fn geocode_text(&mut self, text: &str) -> Option<GeocodedPlace> {
        if let Some(cached) = self.forward.get(text) {
            return cached.clone();
        }
        self.provider_calls += 1;
        let outcome = match self.geocoder.geocode(text) {
            Ok(place) => place,
            Err(error) => {
                warn!(query = text, code = %error.code(), error = %error, "geocoding failed");
                None
            }
        };
        debug!(query = text, found = outcome.is_some(), "geocoded free text");
        self.forward.insert(text.to_owned(), outcome.clone());
        outcome
    }

    /// Resolves coordinates to a generalized `city, state, country` string,
    /// consulting the cache first.
    ///
    /// Provider failures and answers without usable components are cached as
    /// "no result".
    pub fn reverse_geocode(&mut self, at: Coordinates) -> Option<String> {
        let key = at.cache_key();
        if let Some(cached) = self.reverse.get(&key) {
            return cached.clone();
        }
        self.provider_calls += 1;
        let outcome = match self.geocoder.reverse(at) {
            Ok(place) => place.and_then(|components| components.generalized()),
            Err(error) => {
                warn!(
                    latitude = at.latitude,
                    longitude = at.longitude,
                    code = %error.code(),
                    error = %error,
                    "reverse geocoding failed"
                );
                None
            }
        };
        self.reverse.insert(key, outcome.clone());
        outcome
    }

    /// Returns how many lookups reached the provider.
    #[must_use]
    pub fn provider_calls(&self) -> usize {
        self.provider_calls
    }

    /// Returns the wrapped provider.
    #[must_use]
    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }
}

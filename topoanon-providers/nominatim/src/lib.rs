//! Nominatim-backed geocoding for the topoanon engine.
//!
//! [`NominatimGeocoder`] implements [`topoanon_core::Geocoder`] against any
//! service speaking the Nominatim `search`/`reverse` API.

mod errors;
mod geocoder;
mod query;
mod response;

pub use errors::NominatimConfigError;
pub use geocoder::{
    DEFAULT_BASE_URL, DEFAULT_MIN_INTERVAL, DEFAULT_USER_AGENT, GeocodeTransport,
    NominatimGeocoder, UreqGeocodeTransport,
};
pub use query::{REVERSE_PATH, SEARCH_PATH, reverse_url, search_url};
pub use response::{decode_reverse, decode_search};

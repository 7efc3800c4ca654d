//! Decoding of Nominatim `jsonv2` answers.

use serde::Deserialize;
use topoanon_core::{Coordinates, GeocodeError, GeocodedPlace, PlaceComponents};

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    address: Address,
}

#[derive(Debug, Deserialize)]
struct ReverseAnswer {
    error: Option<String>,
    address: Option<Address>,
}

const fn decode_error(message: String) -> GeocodeError {
    GeocodeError::Decode { message }
}

fn parse_degrees(raw: &str) -> Result<f64, GeocodeError> {
    raw.trim()
        .parse()
        .map_err(|_| decode_error(format!("`{raw}` is not a coordinate")))
}

/// Decodes a `search` answer. An empty result list is "no match".
///
/// # Errors
/// Returns [`GeocodeError::Decode`] when the payload is not a list of hits
/// or the first hit's coordinates are not numbers.
///
/// # Examples
/// ```
/// use topoanon_providers_nominatim::decode_search;
///
/// let place = decode_search(br#"[{"lat": "52.09", "lon": "5.12", "address": {"town": "Utrecht"}}]"#)?
///     .expect("one hit");
/// assert_eq!(place.city.as_deref(), Some("Utrecht"));
/// assert_eq!(decode_search(b"[]")?, None);
/// # Ok::<(), topoanon_core::GeocodeError>(())
/// ```
pub fn decode_search(payload: &[u8]) -> Result<Option<GeocodedPlace>, GeocodeError> {
    let hits: Vec<SearchHit> =
        serde_json::from_slice(payload).map_err(|error| decode_error(error.to_string()))?;
    let Some(hit) = hits.into_iter().next() else {
        return Ok(None);
    };
    let coordinates = Coordinates::new(parse_degrees(&hit.lat)?, parse_degrees(&hit.lon)?);
    Ok(Some(GeocodedPlace {
        coordinates,
        city: hit.address.city.or(hit.address.town),
    }))
}

/// Decodes a `reverse` answer. Nominatim reports "nothing here" as an object
/// with an `error` member, which maps to no match.
///
/// # Errors
/// Returns [`GeocodeError::Decode`] when the payload is not a reverse answer.
pub fn decode_reverse(payload: &[u8]) -> Result<Option<PlaceComponents>, GeocodeError> {
    let answer: ReverseAnswer =
        serde_json::from_slice(payload).map_err(|error| decode_error(error.to_string()))?;
    if answer.error.is_some() {
        return Ok(None);
    }
    Ok(answer.address.map(|address| PlaceComponents {
        city: address.city.or(address.town).or(address.village),
        state: address.state,
        country: address.country,
    }))
}

//! Request URL construction.

use topoanon_core::Coordinates;
use url::Url;

/// Forward lookup endpoint, relative to the service root.
pub const SEARCH_PATH: &str = "search";

/// Reverse lookup endpoint, relative to the service root.
pub const REVERSE_PATH: &str = "reverse";

/// Forward lookup URL returning at most one match with address details.
///
/// The free-text query is percent-encoded with spaces as `%20`.
///
/// # Examples
/// ```
/// use topoanon_providers_nominatim::search_url;
/// use url::Url;
///
/// let endpoint = Url::parse("https://geo.example.org/search")?;
/// let url = search_url(&endpoint, "Science Park 140, Amsterdam");
/// assert_eq!(
///     url.query(),
///     Some("q=Science%20Park%20140%2C%20Amsterdam&format=jsonv2&addressdetails=1&limit=1")
/// );
/// # Ok::<(), url::ParseError>(())
/// ```
#[must_use]
pub fn search_url(endpoint: &Url, query: &str) -> Url {
    let mut url = endpoint.clone();
    let pairs = format!(
        "q={}&format=jsonv2&addressdetails=1&limit=1",
        urlencoding::encode(query)
    );
    url.set_query(Some(&pairs));
    url
}

/// Reverse lookup URL asking for English place names.
#[must_use]
pub fn reverse_url(endpoint: &Url, at: Coordinates) -> Url {
    let mut url = endpoint.clone();
    let pairs = format!(
        "lat={}&lon={}&format=jsonv2&addressdetails=1&accept-language=en",
        at.latitude, at.longitude
    );
    url.set_query(Some(&pairs));
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn endpoint(path: &str) -> Url {
        Url::parse("https://geo.test/")
            .and_then(|root| root.join(path))
            .expect("endpoint fixture must parse")
    }

    #[rstest]
    #[case("plain", "q=plain")]
    #[case("a&b=c", "q=a%26b%3Dc")]
    #[case("Rue de l'Église", "q=Rue%20de%20l%27%C3%89glise")]
    #[case("", "q=")]
    fn search_terms_are_percent_encoded(#[case] raw: &str, #[case] expected: &str) {
        let url = search_url(&endpoint(SEARCH_PATH), raw);
        let query = url.query().expect("query must be set");
        assert!(query.starts_with(&format!("{expected}&")), "{query}");
    }

    #[test]
    fn reverse_url_carries_coordinates_and_language() {
        let url = reverse_url(&endpoint(REVERSE_PATH), Coordinates::new(52.5, -4.25));
        assert_eq!(
            url.as_str(),
            "https://geo.test/reverse?lat=52.5&lon=-4.25&format=jsonv2&addressdetails=1&accept-language=en"
        );
    }
}

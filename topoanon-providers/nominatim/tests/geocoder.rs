#![expect(clippy::expect_used, reason = "tests require contextual panics")]
//! Geocoder behaviour over a scripted transport.

use std::{
    cell::RefCell,
    collections::VecDeque,
    rc::Rc,
    time::{Duration, Instant},
};

use rstest::rstest;
use topoanon_core::{Coordinates, GeocodeError, GeocodeResolver, Geocoder};
use topoanon_providers_nominatim::{GeocodeTransport, NominatimConfigError, NominatimGeocoder};
use topoanon_test_support::tracing::RecordingLayer;
use tracing_subscriber::layer::SubscriberExt;

#[derive(Debug, Default)]
struct ScriptedTransport {
    answers: RefCell<VecDeque<Result<Vec<u8>, GeocodeError>>>,
    requests: Rc<RefCell<Vec<(String, String)>>>,
}

impl ScriptedTransport {
    fn answering(answers: impl IntoIterator<Item = Result<&'static str, GeocodeError>>) -> Self {
        Self {
            answers: RefCell::new(
                answers
                    .into_iter()
                    .map(|answer| answer.map(|body| body.as_bytes().to_vec()))
                    .collect(),
            ),
            requests: Rc::default(),
        }
    }
}

impl GeocodeTransport for ScriptedTransport {
    fn get(&self, url: &str, user_agent: &str) -> Result<Vec<u8>, GeocodeError> {
        self.requests
            .borrow_mut()
            .push((url.to_owned(), user_agent.to_owned()));
        self.answers
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(GeocodeError::Status { status: 503 }))
    }
}

fn geocoder(transport: ScriptedTransport) -> NominatimGeocoder<ScriptedTransport> {
    NominatimGeocoder::with_transport("https://geo.test", "topoanon-tests", transport)
        .expect("config valid")
        .with_min_interval(Duration::ZERO)
}

#[test]
fn forward_lookup_builds_search_request() {
    let transport = ScriptedTransport::answering([Ok(
        r#"[{"lat": "52.3545", "lon": "4.9554", "address": {"city": "Amsterdam"}}]"#,
    )]);
    let requests = Rc::clone(&transport.requests);
    let geocoder = geocoder(transport);

    let place = geocoder
        .geocode("Science Park 140, Amsterdam")
        .expect("lookup succeeds")
        .expect("one match");

    assert_eq!(place.city.as_deref(), Some("Amsterdam"));
    assert_eq!(place.coordinates, Coordinates::new(52.3545, 4.9554));
    assert_eq!(
        *requests.borrow(),
        vec![(
            "https://geo.test/search?q=Science%20Park%20140%2C%20Amsterdam&format=jsonv2&addressdetails=1&limit=1"
                .to_owned(),
            "topoanon-tests".to_owned(),
        )]
    );
}

#[test]
fn reverse_lookup_yields_generalized_components() {
    let geocoder = geocoder(ScriptedTransport::answering([Ok(
        r#"{"lat": "52.0", "lon": "4.3", "address": {"village": "Ypenburg", "state": "South Holland", "country": "Netherlands"}}"#,
    )]));

    let place = geocoder
        .reverse(Coordinates::new(52.0, 4.3))
        .expect("lookup succeeds")
        .expect("address present");

    assert_eq!(
        place.generalized().as_deref(),
        Some("Ypenburg, South Holland, Netherlands")
    );
}

#[rstest]
#[case::status(Err(GeocodeError::Status { status: 429 }), "GEOCODE_HTTP_STATUS")]
#[case::transport(
    Err(GeocodeError::Transport { message: "dns failure".to_owned() }),
    "GEOCODE_TRANSPORT"
)]
#[case::decode(Ok("not json"), "GEOCODE_DECODE")]
fn provider_failures_surface_with_codes(
    #[case] answer: Result<&'static str, GeocodeError>,
    #[case] code: &str,
) {
    let geocoder = geocoder(ScriptedTransport::answering([answer]));

    let err = geocoder
        .geocode("anywhere")
        .expect_err("failure must surface");

    assert_eq!(err.code().as_str(), code);
}

#[test]
fn resolver_caches_failures_so_the_provider_is_asked_once() {
    let geocoder = geocoder(ScriptedTransport::answering([Err(GeocodeError::Status {
        status: 500,
    })]));
    let mut resolver = GeocodeResolver::new(&geocoder);

    assert_eq!(resolver.geocode_text("Nowhere"), None);
    assert_eq!(resolver.geocode_text("Nowhere"), None);

    assert_eq!(resolver.provider_calls(), 1);
}

#[test]
fn consecutive_requests_respect_the_minimum_interval() {
    let interval = Duration::from_millis(40);
    let geocoder = geocoder(ScriptedTransport::answering([Ok("[]"), Ok("[]")]))
        .with_min_interval(interval);

    let started = Instant::now();
    assert_eq!(geocoder.geocode("first").expect("lookup succeeds"), None);
    assert_eq!(geocoder.geocode("second").expect("lookup succeeds"), None);

    // The limiter keeps its own clock, so allow for sub-millisecond skew.
    let skew = Duration::from_millis(1);
    assert!(started.elapsed() >= interval.saturating_sub(skew));
}

#[test]
fn service_root_with_a_path_keeps_it() {
    let transport = ScriptedTransport::answering([Ok("[]")]);
    let requests = Rc::clone(&transport.requests);
    let geocoder = NominatimGeocoder::with_transport(
        " https://geo.test/nominatim ",
        "topoanon-tests",
        transport,
    )
    .expect("config valid")
    .with_min_interval(Duration::ZERO);

    assert_eq!(geocoder.base_url(), "https://geo.test/nominatim/");
    assert_eq!(geocoder.geocode("Delft").expect("lookup succeeds"), None);
    assert_eq!(
        requests.borrow()[0].0,
        "https://geo.test/nominatim/search?q=Delft&format=jsonv2&addressdetails=1&limit=1"
    );
}

#[test]
fn lookups_are_traced_with_named_spans() {
    let geocoder = geocoder(ScriptedTransport::answering([
        Ok("[]"),
        Ok(r#"{"error": "Unable to geocode"}"#),
    ]));
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());

    tracing::subscriber::with_default(subscriber, || {
        assert_eq!(geocoder.geocode("Utrecht").expect("lookup succeeds"), None);
        assert_eq!(
            geocoder
                .reverse(Coordinates::new(1.5, 2.5))
                .expect("lookup succeeds"),
            None
        );
    });

    assert!(layer.span("nominatim.search").is_some());
    let reverse = layer
        .span("nominatim.reverse")
        .expect("reverse span must exist");
    assert_eq!(reverse.fields.get("latitude"), Some(&"1.5".to_owned()));
}

#[rstest]
#[case::blank_url("", "agent", NominatimConfigError::EmptyBaseUrl)]
#[case::relative(
    "geo.test",
    "agent",
    NominatimConfigError::InvalidBaseUrl {
        url: "geo.test".to_owned(),
        source: url::ParseError::RelativeUrlWithoutBase,
    }
)]
#[case::scheme(
    "ftp://geo.test",
    "agent",
    NominatimConfigError::UnsupportedScheme { url: "ftp://geo.test".to_owned() }
)]
#[case::blank_agent("https://geo.test", " ", NominatimConfigError::EmptyUserAgent)]
fn invalid_configuration_is_rejected(
    #[case] base_url: &str,
    #[case] user_agent: &str,
    #[case] expected: NominatimConfigError,
) {
    let err = NominatimGeocoder::with_transport(base_url, user_agent, ScriptedTransport::default())
        .expect_err("configuration must be rejected");
    assert_eq!(err, expected);
}

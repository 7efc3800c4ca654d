//! Behaviour of the recording layer under a real subscriber.
use rstest::rstest;
use topoanon_test_support::tracing::RecordingLayer;
use tracing::{Level, info, info_span, subscriber::with_default, warn};
use tracing_subscriber::{Registry, layer::SubscriberExt};

fn capture(body: impl FnOnce()) -> RecordingLayer {
    let layer = RecordingLayer::default();
    let subscriber = Registry::default().with(layer.clone());
    with_default(subscriber, body);
    layer
}

#[test]
fn spans_keep_fields_recorded_after_creation() {
    let layer = capture(|| {
        let span = info_span!("core.demo", devices = 3_u64, nodes = tracing::field::Empty);
        span.record("nodes", 2_u64);
    });

    let span = layer.span("core.demo").expect("span must be captured");
    assert_eq!(span.fields.get("devices").map(String::as_str), Some("3"));
    assert_eq!(span.fields.get("nodes").map(String::as_str), Some("2"));
}

#[rstest]
#[case(Level::WARN, "skipping", 1)]
#[case(Level::INFO, "loaded", 1)]
#[case(Level::WARN, "loaded", 0)]
fn events_are_filtered_by_level_and_message(
    #[case] level: Level,
    #[case] needle: &str,
    #[case] expected: usize,
) {
    let layer = capture(|| {
        info!(category = "devices", "inventory category loaded");
        warn!(code = "RECORD_MALFORMED", "skipping unparseable record");
    });

    assert_eq!(layer.events_matching(level, needle).len(), expected);
}

#[test]
fn display_fields_are_rendered_as_text() {
    let layer = capture(|| {
        let code = "GEOCODE_TRANSPORT";
        warn!(code = %code, "geocoding failed");
    });

    let events = layer.events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].fields.get("code").map(String::as_str),
        Some("GEOCODE_TRANSPORT")
    );
    assert_eq!(events[0].message(), Some("geocoding failed"));
}

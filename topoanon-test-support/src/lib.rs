//! Shared test utilities used across topoanon crates.

pub mod netbox;

pub mod tracing {
    //! A subscriber layer that keeps every span and event for later assertions.
    use std::collections::BTreeMap;
    use std::fmt;
    use std::sync::{Arc, Mutex, MutexGuard};

    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::Context;
    use tracing_subscriber::registry::LookupSpan;

    /// Captures closed spans and emitted events.
    ///
    /// Clones share the same buffers, so a clone can be installed in a
    /// subscriber while the original is kept for assertions.
    ///
    /// # Examples
    /// ```
    /// use topoanon_test_support::tracing::RecordingLayer;
    ///
    /// let layer = RecordingLayer::default();
    /// assert!(layer.spans().is_empty());
    /// assert!(layer.span("core.assemble_topology").is_none());
    /// ```
    #[derive(Clone, Default)]
    pub struct RecordingLayer {
        captured: Arc<Mutex<Captured>>,
    }

    #[derive(Default)]
    struct Captured {
        spans: Vec<SpanRecord>,
        events: Vec<EventRecord>,
    }

    /// A closed span with the fields it recorded over its lifetime.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SpanRecord {
        /// Span name.
        pub name: String,
        /// Recorded fields rendered as text.
        pub fields: BTreeMap<String, String>,
    }

    /// An emitted event.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct EventRecord {
        /// Event level.
        pub level: Level,
        /// Event target.
        pub target: String,
        /// Recorded fields rendered as text; the message is under `message`.
        pub fields: BTreeMap<String, String>,
    }

    impl EventRecord {
        /// Returns the event message.
        #[must_use]
        pub fn message(&self) -> Option<&str> {
            self.fields.get("message").map(String::as_str)
        }
    }

    impl RecordingLayer {
        fn lock(&self) -> MutexGuard<'_, Captured> {
            self.captured
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }

        /// Returns closed spans in closing order.
        #[must_use]
        pub fn spans(&self) -> Vec<SpanRecord> {
            self.lock().spans.clone()
        }

        /// Returns events in emission order.
        #[must_use]
        pub fn events(&self) -> Vec<EventRecord> {
            self.lock().events.clone()
        }

        /// Returns the first closed span called `name`.
        #[must_use]
        pub fn span(&self, name: &str) -> Option<SpanRecord> {
            self.lock()
                .spans
                .iter()
                .find(|span| span.name == name)
                .cloned()
        }

        /// Returns events at `level` whose message contains `needle`.
        #[must_use]
        pub fn events_matching(&self, level: Level, needle: &str) -> Vec<EventRecord> {
            self.lock()
                .events
                .iter()
                .filter(|event| event.level == level)
                .filter(|event| event.message().is_some_and(|message| message.contains(needle)))
                .cloned()
                .collect()
        }
    }

    struct OpenSpan {
        name: &'static str,
        fields: BTreeMap<String, String>,
    }

    impl<S> Layer<S> for RecordingLayer
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
            let Some(span) = ctx.span(id) else {
                return;
            };
            let mut open = OpenSpan {
                name: attrs.metadata().name(),
                fields: BTreeMap::new(),
            };
            attrs.record(&mut TextFields(&mut open.fields));
            span.extensions_mut().insert(open);
        }

        fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
            let Some(span) = ctx.span(id) else {
                return;
            };
            let mut extensions = span.extensions_mut();
            if let Some(open) = extensions.get_mut::<OpenSpan>() {
                values.record(&mut TextFields(&mut open.fields));
            }
        }

        fn on_close(&self, id: Id, ctx: Context<'_, S>) {
            let Some(open) = ctx
                .span(&id)
                .and_then(|span| span.extensions_mut().remove::<OpenSpan>())
            else {
                return;
            };
            self.lock().spans.push(SpanRecord {
                name: open.name.to_owned(),
                fields: open.fields,
            });
        }

        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut fields = BTreeMap::new();
            event.record(&mut TextFields(&mut fields));
            let metadata = event.metadata();
            self.lock().events.push(EventRecord {
                level: *metadata.level(),
                target: metadata.target().to_owned(),
                fields,
            });
        }
    }

    struct TextFields<'a>(&'a mut BTreeMap<String, String>);

    impl Visit for TextFields<'_> {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.insert(field.name().to_owned(), value.to_owned());
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.insert(field.name().to_owned(), format!("{value:?}"));
        }
    }
}

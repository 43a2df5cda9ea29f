use super::{Log, LogLevel};
use serde_json::json;

// Credit to this blog for a high-level overview of implementing a custom tracing layer:
// https://burgers.io/custom-logging-in-rust-using-tracing
//
//   use tracing_subscriber::prelude::*;
//   tracing_subscriber::registry()
//     .with(telemetry::layer::Layer::new(telemetry::stderr_log_handler))
//     .init();

pub struct Layer<H: Fn(Log)>(H);

impl<H: Fn(Log)> Layer<H> {
    pub fn new(handler: H) -> Self {
        Self(handler)
    }

    fn log_from_metadata(&self, metadata: &tracing::Metadata) -> Log {
        let mut log = Log {
            ts: time::OffsetDateTime::now_utc(),
            level: level_from_tracing(metadata.level()),
            message: String::new(),
            fields: Default::default(),
            spans: Default::default(),
        };
        log.fields
            .insert("module".to_string(), to_raw(&metadata.target()));
        log
    }
}

impl<S, H> tracing_subscriber::Layer<S> for Layer<H>
where
    S: tracing::Subscriber,
    S: for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
    H: Fn(Log) + 'static,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut log = self.log_from_metadata(attrs.metadata());
        log.message = attrs.metadata().name().to_string();
        attrs.record(&mut FieldVisitor(&mut log));

        let span = ctx.span(id).unwrap();
        span.extensions_mut().insert(log);
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let span = ctx.span(id).unwrap();
        let mut extensions = span.extensions_mut();
        let log: &mut Log = extensions.get_mut::<Log>().unwrap();
        values.record(&mut FieldVisitor(log));
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut log = self.log_from_metadata(event.metadata());
        event.record(&mut FieldVisitor(&mut log));

        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                let extensions = span.extensions();
                log.spans.push(extensions.get::<Log>().unwrap().clone());
            }
        }

        (self.0)(log)
    }
}

fn to_raw<S: serde::Serialize>(value: &S) -> Box<serde_json::value::RawValue> {
    serde_json::value::to_raw_value(value)
        .unwrap_or_else(|_| serde_json::value::to_raw_value(&json!(null)).unwrap())
}

struct FieldVisitor<'a>(&'a mut Log);

impl<'a> FieldVisitor<'a> {
    fn record_raw<S: serde::Serialize>(&mut self, field: &tracing::field::Field, value: S) {
        if field.name() == "message" && self.0.message.is_empty() {
            self.0.message = json!(value).as_str().unwrap_or_default().to_string();
        } else {
            self.0.fields.insert(field.name().to_string(), to_raw(&value));
        }
    }
}

impl<'a> tracing::field::Visit for FieldVisitor<'a> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.record_raw(field, value)
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.record_raw(field, value)
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.record_raw(field, value)
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.record_raw(field, value)
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" && self.0.message.is_empty() {
            self.0.message = value.to_string();
        } else {
            self.record_raw(field, value)
        }
    }

    fn record_error(
        &mut self,
        field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        let mut chain = vec![value.to_string()];
        let mut next = value.source();
        while let Some(cur) = next {
            chain.push(cur.to_string());
            next = cur.source();
        }
        self.record_raw(field, chain)
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" && self.0.message.is_empty() {
            self.0.message = format!("{value:?}");
        } else {
            self.record_raw(field, format!("{value:?}"))
        }
    }
}

fn level_from_tracing(lvl: &tracing::Level) -> LogLevel {
    match lvl.as_str() {
        "TRACE" => LogLevel::Trace,
        "DEBUG" => LogLevel::Debug,
        "INFO" => LogLevel::Info,
        "WARN" => LogLevel::Warn,
        "ERROR" => LogLevel::Error,
        other => panic!("{other:?} tracing::Level not handled"),
    }
}

#[cfg(test)]
mod test {
    use super::Layer;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::prelude::*;

    #[test]
    fn test_spans_and_events_are_mapped_to_structured_logs() {
        let out = Arc::new(Mutex::new(Vec::new()));
        let out_clone = out.clone();

        let _guard = tracing_subscriber::registry()
            .with(
                Layer::new(move |log| out_clone.lock().unwrap().push(log))
                    .with_filter(tracing::level_filters::LevelFilter::DEBUG),
            )
            .set_default();

        let span = tracing::info_span!("enriching", raw_payload_bytes = 128);
        let _enter = span.enter();
        tracing::warn!(schema_not_found = true, "skipping enricher");

        drop(_enter);

        let logs = out.lock().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "skipping enricher");
        assert_eq!(logs[0].spans.len(), 1);
        assert_eq!(logs[0].spans[0].message, "enriching");
    }
}

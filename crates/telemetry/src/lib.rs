use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

pub mod layer;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Log {
    /// Timestamp at which the Log was created.
    #[serde(
        serialize_with = "time::serde::rfc3339::serialize",
        deserialize_with = "time::serde::rfc3339::deserialize"
    )]
    pub ts: time::OffsetDateTime,
    /// Level of the log.
    pub level: LogLevel,
    /// Message of the log.
    pub message: String,
    /// Supplemental fields of the log.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Box<serde_json::value::RawValue>>,
    /// Spans active when the log was emitted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<Log>,
}

/// stderr_log_handler is a log handler that writes canonical
/// JSON log serializations to stderr.
pub fn stderr_log_handler(log: Log) {
    let mut buf = serde_json::to_vec(&log).expect("Log always serializes");
    buf.push(b'\n');
    _ = std::io::stderr().write_all(&buf); // Best-effort.
}

/// new_encoded_json_write_handler returns a log handler that
/// writes canonical JSON log serializations to the given writer.
pub fn new_encoded_json_write_handler<W>(
    writer: std::sync::Arc<std::sync::Mutex<W>>,
) -> impl Fn(Log) + Send + Sync + 'static
where
    W: std::io::Write + Send + 'static,
{
    move |log: Log| {
        let mut buf = serde_json::to_vec(&log).expect("Log always serializes");
        buf.push(b'\n');
        _ = writer
            .lock()
            .expect("writer is never poisoned")
            .write_all(&buf); // Best-effort.
    }
}

/// Installs a global tracing subscriber that emits [`Log`] lines through `handler`,
/// filtered by `RUST_LOG` (default `info`).
pub fn init<H>(handler: H)
where
    H: Fn(Log) + Send + Sync + 'static,
{
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(layer::Layer::new(handler).with_filter(env_filter))
        .init();
}

#[cfg(test)]
mod test {
    use super::{Log, LogLevel};
    use crate::new_encoded_json_write_handler;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_encoded_json_write_handler() {
        let writer = Arc::new(Mutex::new(Vec::new()));
        let handler = new_encoded_json_write_handler(writer.clone());

        let mut log = Log {
            ts: time::OffsetDateTime::UNIX_EPOCH,
            level: LogLevel::Warn,
            message: "hello world".to_string(),
            fields: [(
                "name".to_string(),
                serde_json::value::to_raw_value("value").unwrap(),
            )]
            .into_iter()
            .collect(),
            spans: Vec::new(),
        };

        handler(log.clone());
        log.message = "I'm different!".to_string();
        handler(log);

        std::mem::drop(handler);
        let writer = Arc::try_unwrap(writer).unwrap().into_inner().unwrap();
        let text = String::from_utf8_lossy(&writer);

        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("hello world"));
        assert!(text.contains("I'm different!"));
    }
}

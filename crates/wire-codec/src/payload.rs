use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `schema` tag written onto a Thrift-encoded envelope.
pub const THRIFT_SCHEMA: &str = "iglu:com.snowplowanalytics.snowplow/CollectorPayload/thrift/1-0-0";
/// `schema` tag written onto an Avro-encoded envelope.
pub const AVRO_SCHEMA_NAME: &str = "CollectorPayload";

/// The raw envelope produced by a collector and consumed by an enricher.
/// Immutable once built; serialised exactly once and discarded after ack.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollectorPayload {
    pub schema: String,
    pub ip_address: String,
    /// Milliseconds since the Unix epoch. Must be non-negative.
    pub timestamp: i64,
    pub encoding: String,
    pub collector: String,

    pub user_agent: Option<String>,
    pub referer_uri: Option<String>,
    pub path: Option<String>,
    pub querystring: Option<String>,
    pub body: Option<Vec<u8>>,
    /// Each entry is `"Name: Value"`; never more than one `:` split is implied.
    pub headers: Option<Vec<String>>,
    pub content_type: Option<String>,
    pub hostname: Option<String>,
    pub network_user_id: Option<String>,
}

impl CollectorPayload {
    /// Splits `Name: Value` header lines into a map, dropping any line that
    /// doesn't contain a `:` separator rather than failing the whole payload.
    pub fn headers_map(&self) -> HashMap<String, String> {
        let Some(headers) = &self.headers else {
            return HashMap::new();
        };
        headers
            .iter()
            .filter_map(|h| h.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect()
    }
}

/// A raw payload, or one item within it, that could not be carried through
/// the pipeline. Written to the errors lane as UTF-8 JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub collector_domain: String,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339")]
    pub tstamp: time::OffsetDateTime,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub payload: Option<Vec<u8>>,
}

impl ErrorPayload {
    pub fn new(collector_domain: impl Into<String>, reason: impl Into<String>) -> Self {
        ErrorPayload {
            collector_domain: collector_domain.into(),
            reason: reason.into(),
            tstamp: time::OffsetDateTime::now_utc(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("ErrorPayload always serializes")
    }
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) => base64::engine::general_purpose::STANDARD
                .decode(s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_headers_map_skips_malformed_lines() {
        let payload = CollectorPayload {
            headers: Some(vec![
                "Content-Type: text/plain".to_string(),
                "no-colon-here".to_string(),
                "X-Forwarded-For: 1.2.3.4".to_string(),
            ]),
            ..Default::default()
        };
        let map = payload.headers_map();
        assert_eq!(map.get("Content-Type").map(String::as_str), Some("text/plain"));
        assert_eq!(map.get("X-Forwarded-For").map(String::as_str), Some("1.2.3.4"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_error_payload_round_trips_through_json() {
        let err = ErrorPayload::new("example.com", "DECODE_ERROR: bad frame")
            .with_payload(vec![0xde, 0xad, 0xbe, 0xef]);
        let bytes = err.to_bytes();
        let decoded: ErrorPayload = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.collector_domain, "example.com");
        assert_eq!(decoded.payload, Some(vec![0xde, 0xad, 0xbe, 0xef]));
    }
}

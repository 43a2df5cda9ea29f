//! Schemaless Avro encode/decode of `CollectorPayload`, matching the fixed
//! record schema the Python collector writes with `fastavro`'s
//! `schemaless_writer`/`schemaless_reader` (no embedded schema on the wire).

use apache_avro::types::Value;
use apache_avro::{from_avro_datum, to_avro_datum, Schema};
use std::sync::OnceLock;

use crate::error::CodecError;
use crate::payload::CollectorPayload;

const SCHEMA_JSON: &str = r#"{
    "type": "record",
    "name": "CollectorPayload",
    "namespace": "io.datenstrom",
    "fields": [
        {"name": "schema", "type": "string"},
        {"name": "ipAddress", "type": "string"},
        {"name": "timestamp", "type": "long"},
        {"name": "encoding", "type": "string"},
        {"name": "collector", "type": "string"},
        {"name": "userAgent", "type": ["null", "string"]},
        {"name": "refererUri", "type": ["null", "string"]},
        {"name": "path", "type": ["null", "string"]},
        {"name": "querystring", "type": ["null", "string"]},
        {"name": "body", "type": ["null", "bytes"]},
        {"name": "headers", "type": ["null", {"type": "array", "items": "string"}]},
        {"name": "contentType", "type": ["null", "string"]},
        {"name": "hostname", "type": ["null", "string"]},
        {"name": "networkUserId", "type": ["null", "string"]}
    ]
}"#;

fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| Schema::parse_str(SCHEMA_JSON).expect("embedded Avro schema is valid"))
}

fn opt_string(v: &Option<String>) -> Value {
    match v {
        Some(s) => Value::Union(1, Box::new(Value::String(s.clone()))),
        None => Value::Union(0, Box::new(Value::Null)),
    }
}

pub fn encode(payload: &CollectorPayload) -> Vec<u8> {
    let headers = match &payload.headers {
        Some(hs) => Value::Union(
            1,
            Box::new(Value::Array(
                hs.iter().cloned().map(Value::String).collect(),
            )),
        ),
        None => Value::Union(0, Box::new(Value::Null)),
    };
    let body = match &payload.body {
        Some(b) => Value::Union(1, Box::new(Value::Bytes(b.clone()))),
        None => Value::Union(0, Box::new(Value::Null)),
    };

    let record = Value::Record(vec![
        ("schema".to_string(), Value::String(payload.schema.clone())),
        (
            "ipAddress".to_string(),
            Value::String(payload.ip_address.clone()),
        ),
        ("timestamp".to_string(), Value::Long(payload.timestamp)),
        (
            "encoding".to_string(),
            Value::String(payload.encoding.clone()),
        ),
        (
            "collector".to_string(),
            Value::String(payload.collector.clone()),
        ),
        ("userAgent".to_string(), opt_string(&payload.user_agent)),
        ("refererUri".to_string(), opt_string(&payload.referer_uri)),
        ("path".to_string(), opt_string(&payload.path)),
        ("querystring".to_string(), opt_string(&payload.querystring)),
        ("body".to_string(), body),
        ("headers".to_string(), headers),
        ("contentType".to_string(), opt_string(&payload.content_type)),
        ("hostname".to_string(), opt_string(&payload.hostname)),
        (
            "networkUserId".to_string(),
            opt_string(&payload.network_user_id),
        ),
    ]);

    to_avro_datum(schema(), record).expect("CollectorPayload always conforms to its own schema")
}

pub fn decode(bytes: &[u8]) -> Result<CollectorPayload, CodecError> {
    let mut cursor = bytes;
    let value = from_avro_datum(schema(), &mut cursor, None).map_err(|e| CodecError::Decode {
        format: "avro",
        reason: e.to_string(),
    })?;

    let Value::Record(fields) = value else {
        return Err(CodecError::Decode {
            format: "avro",
            reason: "top-level value is not a record".to_string(),
        });
    };

    let mut payload = CollectorPayload::default();
    for (name, val) in fields {
        match name.as_str() {
            "schema" => payload.schema = expect_string(val)?,
            "ipAddress" => payload.ip_address = expect_string(val)?,
            "timestamp" => payload.timestamp = expect_long(val)?,
            "encoding" => payload.encoding = expect_string(val)?,
            "collector" => payload.collector = expect_string(val)?,
            "userAgent" => payload.user_agent = expect_opt_string(val)?,
            "refererUri" => payload.referer_uri = expect_opt_string(val)?,
            "path" => payload.path = expect_opt_string(val)?,
            "querystring" => payload.querystring = expect_opt_string(val)?,
            "body" => payload.body = expect_opt_bytes(val)?,
            "headers" => payload.headers = expect_opt_string_list(val)?,
            "contentType" => payload.content_type = expect_opt_string(val)?,
            "hostname" => payload.hostname = expect_opt_string(val)?,
            "networkUserId" => payload.network_user_id = expect_opt_string(val)?,
            _ => {}
        }
    }

    if payload.timestamp < 0 {
        return Err(CodecError::Decode {
            format: "avro",
            reason: format!("timestamp must be non-negative, got {}", payload.timestamp),
        });
    }

    Ok(payload)
}

fn expect_string(v: Value) -> Result<String, CodecError> {
    match v {
        Value::String(s) => Ok(s),
        other => Err(CodecError::Decode {
            format: "avro",
            reason: format!("expected string, got {other:?}"),
        }),
    }
}

fn expect_long(v: Value) -> Result<i64, CodecError> {
    match v {
        Value::Long(n) => Ok(n),
        other => Err(CodecError::Decode {
            format: "avro",
            reason: format!("expected long, got {other:?}"),
        }),
    }
}

fn unwrap_union(v: Value) -> Value {
    match v {
        Value::Union(_, inner) => *inner,
        other => other,
    }
}

fn expect_opt_string(v: Value) -> Result<Option<String>, CodecError> {
    match unwrap_union(v) {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(CodecError::Decode {
            format: "avro",
            reason: format!("expected optional string, got {other:?}"),
        }),
    }
}

fn expect_opt_bytes(v: Value) -> Result<Option<Vec<u8>>, CodecError> {
    match unwrap_union(v) {
        Value::Null => Ok(None),
        Value::Bytes(b) => Ok(Some(b)),
        other => Err(CodecError::Decode {
            format: "avro",
            reason: format!("expected optional bytes, got {other:?}"),
        }),
    }
}

fn expect_opt_string_list(v: Value) -> Result<Option<Vec<String>>, CodecError> {
    match unwrap_union(v) {
        Value::Null => Ok(None),
        Value::Array(items) => items
            .into_iter()
            .map(expect_string)
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        other => Err(CodecError::Decode {
            format: "avro",
            reason: format!("expected optional array of string, got {other:?}"),
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> CollectorPayload {
        CollectorPayload {
            schema: crate::payload::AVRO_SCHEMA_NAME.to_string(),
            ip_address: "127.0.0.1".to_string(),
            timestamp: 1_700_000_000_000,
            encoding: "UTF-8".to_string(),
            collector: "ssc-2.5.0-kafka".to_string(),
            user_agent: Some("Mozilla/5.0".to_string()),
            referer_uri: None,
            path: Some("/com.snowplowanalytics.snowplow/tp2".to_string()),
            querystring: None,
            body: Some(br#"{"schema":"s","data":[]}"#.to_vec()),
            headers: Some(vec!["Content-Type: application/json".to_string()]),
            content_type: Some("application/json".to_string()),
            hostname: Some("collector.example.com".to_string()),
            network_user_id: None,
        }
    }

    #[test]
    fn test_round_trip_preserves_every_field() {
        let original = sample();
        let decoded = decode(&encode(&original)).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_round_trip_with_all_optionals_absent() {
        let original = CollectorPayload {
            schema: crate::payload::AVRO_SCHEMA_NAME.to_string(),
            ip_address: "10.0.0.1".to_string(),
            timestamp: 0,
            encoding: "UTF-8".to_string(),
            collector: "ssc".to_string(),
            ..Default::default()
        };
        let decoded = decode(&encode(&original)).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_truncated_input_is_a_decode_error() {
        let encoded = encode(&sample());
        assert!(decode(&encoded[..4]).is_err());
    }
}

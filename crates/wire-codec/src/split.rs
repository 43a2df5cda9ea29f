use crate::error::CodecError;
use crate::payload::CollectorPayload;
use crate::Format;

/// Serialises `payload`, splitting its `payload_data`-shaped JSON body across
/// multiple frames if the whole thing doesn't fit in `max_size` bytes.
///
/// Order of items across output frames matches their order in the input
/// body's `data` array. If the body isn't a `{schema, data: [...]}` object,
/// the body is dropped and the bare envelope is emitted instead, with a
/// warning — this never fails silently.
pub fn split_and_serialize(
    payload: &CollectorPayload,
    format: Format,
    max_size: usize,
) -> Result<Vec<Vec<u8>>, CodecError> {
    let encode = |p: &CollectorPayload| match format {
        Format::Thrift => crate::thrift::encode(p),
        Format::Avro => crate::avro::encode(p),
    };

    let full = encode(payload);
    if full.len() <= max_size {
        return Ok(vec![full]);
    }

    let mut envelope = payload.clone();
    envelope.body = None;
    let envelope_bytes = encode(&envelope);
    if envelope_bytes.len() > max_size {
        return Err(CodecError::OversizedEnvelope {
            size: envelope_bytes.len(),
            max_size,
        });
    }

    let Some(body) = &payload.body else {
        return Ok(vec![envelope_bytes]);
    };

    let parsed: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!("payload body is not valid JSON, dropping it to fit the envelope");
            return Ok(vec![envelope_bytes]);
        }
    };

    let data_items = match parsed.as_object().and_then(|o| o.get("data")?.as_array()) {
        Some(items) if parsed.get("schema").is_some() => items.clone(),
        _ => {
            tracing::warn!("payload body is not a {{schema, data: [...]}} object, dropping it to fit the envelope");
            return Ok(vec![envelope_bytes]);
        }
    };

    if data_items.is_empty() {
        return Ok(vec![envelope_bytes]);
    }

    let schema_value = parsed["schema"].clone();
    let mut frames = Vec::new();
    let mut current: Vec<serde_json::Value> = Vec::new();

    for item in data_items {
        let mut candidate = current.clone();
        candidate.push(item.clone());
        let candidate_body = body_bytes(&schema_value, &candidate);

        if envelope_bytes.len() + candidate_body.len() > max_size {
            if current.is_empty() {
                return Err(CodecError::OversizedItem {
                    size: envelope_bytes.len() + candidate_body.len(),
                    max_size,
                });
            }
            frames.push(encode_group(payload, &schema_value, &current, &encode));
            current = vec![item];
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        frames.push(encode_group(payload, &schema_value, &current, &encode));
    }

    tracing::info!(frame_count = frames.len(), "split oversized payload");
    Ok(frames)
}

fn body_bytes(schema: &serde_json::Value, items: &[serde_json::Value]) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({ "schema": schema, "data": items }))
        .expect("json always serializes")
}

fn encode_group(
    payload: &CollectorPayload,
    schema: &serde_json::Value,
    items: &[serde_json::Value],
    encode: impl Fn(&CollectorPayload) -> Vec<u8>,
) -> Vec<u8> {
    let mut frame = payload.clone();
    frame.body = Some(body_bytes(schema, items));
    encode(&frame)
}

#[cfg(test)]
mod test {
    use super::*;

    fn payload_with_items(n: usize) -> CollectorPayload {
        let data: Vec<serde_json::Value> = (0..n)
            .map(|i| serde_json::json!({"e": "pv", "eid": format!("item-{i}"), "url": "http://example.com/a/b/c/d/e/f"}))
            .collect();
        let body = serde_json::json!({
            "schema": "iglu:com.snowplowanalytics.snowplow/payload_data/jsonschema/1-0-4",
            "data": data,
        });
        CollectorPayload {
            schema: crate::payload::THRIFT_SCHEMA.to_string(),
            ip_address: "127.0.0.1".to_string(),
            timestamp: 1,
            encoding: "UTF-8".to_string(),
            collector: "ssc".to_string(),
            body: Some(serde_json::to_vec(&body).unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn test_small_payload_is_a_single_frame() {
        let payload = payload_with_items(1);
        let frames = split_and_serialize(&payload, Format::Thrift, 1 << 20).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_oversized_payload_splits_preserving_order() {
        let payload = payload_with_items(40);
        let frames = split_and_serialize(&payload, Format::Thrift, 2048).unwrap();
        assert!(frames.len() >= 2, "expected at least two frames, got {}", frames.len());
        for frame in &frames {
            assert!(frame.len() <= 2048, "frame of {} bytes exceeds max_size", frame.len());
        }

        let mut recovered_ids = Vec::new();
        for frame in &frames {
            let decoded = crate::thrift::decode(frame).unwrap();
            let body: serde_json::Value =
                serde_json::from_slice(&decoded.body.unwrap()).unwrap();
            for item in body["data"].as_array().unwrap() {
                recovered_ids.push(item["eid"].as_str().unwrap().to_string());
            }
        }
        let expected: Vec<String> = (0..40).map(|i| format!("item-{i}")).collect();
        assert_eq!(recovered_ids, expected);
    }

    #[test]
    fn test_oversized_envelope_fails() {
        let mut payload = payload_with_items(0);
        payload.hostname = Some("x".repeat(10_000));
        let err = split_and_serialize(&payload, Format::Thrift, 100).unwrap_err();
        assert!(matches!(err, CodecError::OversizedEnvelope { .. }));
    }

    #[test]
    fn test_single_oversized_item_fails() {
        let data = vec![serde_json::json!({"url": "x".repeat(5000)})];
        let body = serde_json::json!({"schema": "s", "data": data});
        let payload = CollectorPayload {
            schema: crate::payload::THRIFT_SCHEMA.to_string(),
            ip_address: "127.0.0.1".to_string(),
            timestamp: 1,
            encoding: "UTF-8".to_string(),
            collector: "ssc".to_string(),
            body: Some(serde_json::to_vec(&body).unwrap()),
            ..Default::default()
        };
        let err = split_and_serialize(&payload, Format::Thrift, 1024).unwrap_err();
        assert!(matches!(err, CodecError::OversizedItem { .. }));
    }

    #[test]
    fn test_non_payload_data_body_is_dropped_not_failed() {
        let mut payload = payload_with_items(0);
        payload.body = Some(b"not json at all, and quite long ".repeat(200));
        let frames = split_and_serialize(&payload, Format::Thrift, 1024).unwrap();
        assert_eq!(frames.len(), 1);
        let decoded = crate::thrift::decode(&frames[0]).unwrap();
        assert!(decoded.body.is_none());
    }
}

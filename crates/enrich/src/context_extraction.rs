//! Unwraps the tracker protocol's `cx` (base64 JSON, preferred) or `co`
//! (plain JSON) contexts envelope into individual self-describing contexts,
//! validating and attaching each one. A `client_session` context also gets
//! its `sessionId`/`sessionIndex` flattened onto the atomic record.

use std::sync::Arc;

use async_trait::async_trait;
use atomic::{SelfDescribingContext, TemporaryAtomicEvent};
use iglu::SchemaRegistry;

use crate::event_extraction::decode_base64_json;
use crate::{EnrichError, Enrichment};

pub struct ContextExtractionEnrichment {
    registry: Arc<SchemaRegistry>,
}

impl ContextExtractionEnrichment {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        ContextExtractionEnrichment { registry }
    }
}

#[async_trait]
impl Enrichment for ContextExtractionEnrichment {
    async fn enrich(&self, event: &mut TemporaryAtomicEvent) -> Result<(), EnrichError> {
        let envelope: serde_json::Value = if let Some(cx) = event.get_str("cx") {
            decode_base64_json(cx)?
        } else if let Some(co) = event.get_str("co") {
            serde_json::from_str(co).map_err(|e| EnrichError::InvalidJson { field: "co", source: e })?
        } else {
            return Ok(());
        };

        // The envelope itself is a self-describing `contexts` wrapper; its
        // own schema isn't checked here, only that it has the expected shape.
        let context_list = envelope
            .get("data")
            .and_then(|v| v.as_array())
            .ok_or_else(|| EnrichError::Invalid("missing data in contexts".to_string()))?;

        for item in context_list {
            let schema = item
                .get("schema")
                .and_then(|v| v.as_str())
                .ok_or_else(|| EnrichError::Invalid("missing schema in contexts".to_string()))?
                .to_string();
            let data = item
                .get("data")
                .ok_or_else(|| EnrichError::Invalid("missing data in contexts".to_string()))?
                .clone();

            self.registry.validate(&schema, &data).await?;

            let reference = self.registry.parts(&schema).await?;
            if reference.name == "client_session" {
                if let Some(session_id) = data.get("sessionId").cloned() {
                    event.set_value("session_id", session_id)?;
                }
                if let Some(session_idx) = data.get("sessionIndex").cloned() {
                    event.set_value("session_idx", session_idx)?;
                }
            }

            event.add_context(SelfDescribingContext { schema, data })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;
    use url::Url;
    use wire_codec::CollectorPayload;

    fn registry() -> Arc<SchemaRegistry> {
        Arc::new(
            SchemaRegistry::new(
                &[Url::parse("http://127.0.0.1:1/").unwrap()],
                Duration::from_secs(3600),
                Duration::from_secs(60),
            )
            .unwrap(),
        )
    }

    fn event_with(key: &str, value: String) -> TemporaryAtomicEvent {
        let raw = Arc::new(CollectorPayload::default());
        let mut event = TemporaryAtomicEvent::new(raw);
        event.set_short(key, value);
        event
    }

    #[tokio::test]
    async fn test_no_context_keys_is_a_noop() {
        let raw = Arc::new(CollectorPayload::default());
        let mut event = TemporaryAtomicEvent::new(raw);
        ContextExtractionEnrichment::new(registry()).enrich(&mut event).await.unwrap();
        assert!(event.contexts().is_empty());
    }

    #[tokio::test]
    async fn test_adds_a_plain_device_info_context_from_co() {
        let envelope = serde_json::json!({
            "schema": "iglu:com.snowplowanalytics.snowplow/contexts/jsonschema/1-0-0",
            "data": [
                {
                    "schema": "iglu:io.datenstrom/device_info/jsonschema/1-0-0",
                    "data": {"browser_family": "Chrome"}
                }
            ]
        });
        let mut event = event_with("co", envelope.to_string());

        ContextExtractionEnrichment::new(registry()).enrich(&mut event).await.unwrap();

        assert_eq!(event.contexts().len(), 1);
        assert_eq!(event.contexts()[0].data["browser_family"], "Chrome");
    }

    #[tokio::test]
    async fn test_client_session_context_flattens_onto_the_atomic_record() {
        let envelope = serde_json::json!({
            "schema": "iglu:com.snowplowanalytics.snowplow/contexts/jsonschema/1-0-0",
            "data": [
                {
                    "schema": "iglu:io.datenstrom/client_session/jsonschema/1-0-0",
                    "data": {"sessionId": "abc-123", "sessionIndex": 4}
                }
            ]
        });
        let mut event = event_with("co", envelope.to_string());

        ContextExtractionEnrichment::new(registry()).enrich(&mut event).await.unwrap();

        assert_eq!(event.get_value("session_id").unwrap().as_str(), Some("abc-123"));
        assert_eq!(event.get_value("session_idx").unwrap().as_i64(), Some(4));
    }
}

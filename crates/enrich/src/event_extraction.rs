//! Resolves the event's own schema and builds its `event` (self-describing
//! payload), either by unwrapping an `ue_px`/`ue_pr` unstructured-event
//! envelope or by filtering the scratchpad's temp data down to the fields
//! the resolved schema declares.

use std::sync::Arc;

use async_trait::async_trait;
use atomic::{SelfDescribingEvent, TemporaryAtomicEvent};
use base64::Engine;
use iglu::{IgluReference, SchemaRegistry};

use crate::{EnrichError, Enrichment};

pub const PV_SCHEMA: &str = "iglu:io.datenstrom/page_view/jsonschema/1-0-0";
pub const PP_SCHEMA: &str = "iglu:io.datenstrom/page_ping/jsonschema/1-0-0";
pub const SE_SCHEMA: &str = "iglu:io.datenstrom/structured_event/jsonschema/1-0-0";
pub const TR_SCHEMA: &str = "iglu:io.datenstrom/transaction/jsonschema/1-0-0";
pub const TI_SCHEMA: &str = "iglu:io.datenstrom/transaction_item/jsonschema/1-0-0";

/// Maps the tracker protocol's `e` shorthand to its atomic event schema.
/// `ue` (unstructured event) has no fixed schema here — its schema comes
/// from the `ue_px`/`ue_pr` envelope instead.
pub fn schema_for_event_type(event_type: &str) -> Result<&'static str, EnrichError> {
    match event_type {
        "pv" => Ok(PV_SCHEMA),
        "pp" => Ok(PP_SCHEMA),
        "se" => Ok(SE_SCHEMA),
        "tr" => Ok(TR_SCHEMA),
        "ti" => Ok(TI_SCHEMA),
        other => Err(EnrichError::UnknownEventType(other.to_string())),
    }
}

/// Tracker base64 payloads aren't always padded to a multiple of 4.
pub fn decode_base64_json(data: &str) -> Result<serde_json::Value, EnrichError> {
    let mut padded = data.to_string();
    let remainder = padded.len() % 4;
    if remainder != 0 {
        padded.push_str(&"=".repeat(4 - remainder));
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&padded)
        .map_err(|e| EnrichError::InvalidBase64 { field: "ue_px", source: e })?;
    serde_json::from_slice(&bytes).map_err(|e| EnrichError::InvalidJson { field: "ue_px", source: e })
}

pub struct EventExtractionEnrichment {
    registry: Arc<SchemaRegistry>,
}

impl EventExtractionEnrichment {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        EventExtractionEnrichment { registry }
    }
}

#[derive(Clone, Copy)]
enum SubKind {
    Str,
    Int,
}

/// Tracker keys that only make sense once the event's own schema is known.
/// `transaction`/`transaction_item` need no renaming — their schemas already
/// use the tracker's own short field names (`tr_id`, `ti_qu`, ...).
const PAGE_PING_TABLE: &[(&str, &str, SubKind)] = &[
    ("pp_mix", "pp_xoffset_min", SubKind::Int),
    ("pp_max", "pp_xoffset_max", SubKind::Int),
    ("pp_miy", "pp_yoffset_min", SubKind::Int),
    ("pp_may", "pp_yoffset_max", SubKind::Int),
];
const STRUCTURED_EVENT_TABLE: &[(&str, &str, SubKind)] = &[
    ("se_ca", "category", SubKind::Str),
    ("se_ac", "action", SubKind::Str),
    ("se_la", "label", SubKind::Str),
    ("se_pr", "property", SubKind::Str),
    ("se_va", "value", SubKind::Str),
];

fn apply_sub_transformations(event: &mut TemporaryAtomicEvent, event_name: &str) -> Result<(), EnrichError> {
    let table: &[(&str, &str, SubKind)] = match event_name {
        "page_ping" => PAGE_PING_TABLE,
        "structured_event" => STRUCTURED_EVENT_TABLE,
        _ => &[],
    };
    for (short_key, field, kind) in table {
        let Some(raw) = event.get_str(short_key).map(str::to_string) else {
            continue;
        };
        let value = match kind {
            SubKind::Str => serde_json::Value::String(raw),
            SubKind::Int => {
                let parsed: i64 = raw
                    .parse()
                    .map_err(|_| EnrichError::Invalid(format!("invalid int value for {short_key}: {raw}")))?;
                serde_json::Value::Number(parsed.into())
            }
        };
        event.set_short(*field, value);
    }
    Ok(())
}

#[async_trait]
impl Enrichment for EventExtractionEnrichment {
    async fn enrich(&self, event: &mut TemporaryAtomicEvent) -> Result<(), EnrichError> {
        if !event.contains("schema") {
            let envelope: serde_json::Value = if let Some(ue_px) = event.get_str("ue_px") {
                decode_base64_json(ue_px)?
            } else if let Some(ue_pr) = event.get_str("ue_pr") {
                serde_json::from_str(ue_pr)
                    .map_err(|e| EnrichError::InvalidJson { field: "ue_pr", source: e })?
            } else {
                return Err(EnrichError::Invalid(
                    "no schema and no unstructured event envelope".to_string(),
                ));
            };

            // The envelope is the unstruct_event wrapper; the real event is nested
            // one level down in its `data` field.
            if envelope.get("schema").is_none() {
                return Err(EnrichError::Invalid("missing schema in self describing event".to_string()));
            }
            let inner = envelope
                .get("data")
                .ok_or_else(|| EnrichError::Invalid("missing data in self describing event".to_string()))?;

            let inner_schema = inner
                .get("schema")
                .and_then(|v| v.as_str())
                .ok_or_else(|| EnrichError::Invalid("missing schema in inner self describing event".to_string()))?
                .to_string();
            let inner_data = inner
                .get("data")
                .ok_or_else(|| EnrichError::Invalid("missing data in inner self describing event".to_string()))?
                .clone();

            self.registry.validate(&inner_schema, &inner_data).await?;
            event.set_short("schema", inner_schema.clone());
            event.set_event(SelfDescribingEvent { schema: inner_schema, data: inner_data })?;
        }

        let schema = event
            .get_str("schema")
            .ok_or_else(|| EnrichError::Invalid("schema missing after extraction".to_string()))?
            .to_string();

        let reference = IgluReference::from_string(&schema)?;
        event.set_value("event_vendor", reference.vendor.clone())?;
        event.set_value("event_name", reference.name.clone())?;
        event.set_value("event_version", reference.version.clone())?;

        apply_sub_transformations(event, &reference.name)?;

        if !event.has_event() {
            if let Some(inline_event) = event.get("event").cloned() {
                // already a self-describing body - cast and validate it.
                self.registry.validate(&schema, &inline_event).await?;
                event.set_event(SelfDescribingEvent { schema: schema.clone(), data: inline_event })?;
            } else {
                let fields = self.registry.fields(&schema).await?;
                let mut data = serde_json::Map::new();
                for key in &fields {
                    if let Some(value) = event.get(key) {
                        data.insert(key.clone(), value.clone());
                    }
                }
                let data = serde_json::Value::Object(data);
                self.registry.validate(&schema, &data).await?;
                event.set_event(SelfDescribingEvent { schema, data })?;
            }
        }

        // Structured events keep their fields on the atomic record too, alongside
        // the nested self-describing event, so downstream consumers can query
        // `category`/`action`/... without unpacking `event.data`.
        if reference.name == "structured_event" {
            if let Some(se) = event.event() {
                let data = se.data.clone();
                for field in ["category", "action", "label", "property", "value"] {
                    if let Some(value) = data.get(field).cloned() {
                        if !value.is_null() {
                            event.set_value(field, value)?;
                        }
                    }
                }
            }
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

    #[tokio::test]
    async fn test_builds_event_from_filtered_temp_fields_given_explicit_schema() {
        let raw = Arc::new(CollectorPayload::default());
        let mut event = TemporaryAtomicEvent::new(raw);
        event.set_short("schema", PV_SCHEMA);
        event.set_short("page_url", "https://example.com/");
        event.set_short("page_title", "Example");
        event.set_short("unrelated_key", "ignored");

        EventExtractionEnrichment::new(registry()).enrich(&mut event).await.unwrap();

        assert_eq!(event.get_value("event_vendor").unwrap().as_str(), Some("io.datenstrom"));
        assert_eq!(event.get_value("event_name").unwrap().as_str(), Some("page_view"));
        assert!(event.has_event());
    }

    #[tokio::test]
    async fn test_unwraps_unstructured_event_envelope() {
        let raw = Arc::new(CollectorPayload::default());
        let mut event = TemporaryAtomicEvent::new(raw);
        let envelope = serde_json::json!({
            "schema": "iglu:com.snowplowanalytics.snowplow/unstruct_event/jsonschema/1-0-0",
            "data": {
                "schema": PV_SCHEMA,
                "data": {"page_url": "https://example.com/"}
            }
        });
        let encoded = base64::engine::general_purpose::STANDARD.encode(envelope.to_string());
        event.set_short("ue_px", encoded);

        EventExtractionEnrichment::new(registry()).enrich(&mut event).await.unwrap();

        assert!(event.has_event());
        assert_eq!(event.get_str("schema"), Some(PV_SCHEMA));
    }

    #[tokio::test]
    async fn test_structured_event_flattens_fields_onto_the_atomic_record() {
        let raw = Arc::new(CollectorPayload::default());
        let mut event = TemporaryAtomicEvent::new(raw);
        event.set_short("schema", SE_SCHEMA);
        event.set_short("se_ca", "checkout");
        event.set_short("se_ac", "click");

        EventExtractionEnrichment::new(registry()).enrich(&mut event).await.unwrap();

        assert_eq!(event.get_value("category").unwrap().as_str(), Some("checkout"));
        assert_eq!(event.get_value("action").unwrap().as_str(), Some("click"));
        assert_eq!(event.event().unwrap().data["category"], "checkout");
    }

    #[test]
    fn test_schema_for_event_type_rejects_unstruct_shorthand() {
        assert!(schema_for_event_type("ue").is_err());
        assert_eq!(schema_for_event_type("pv").unwrap(), PV_SCHEMA);
    }
}

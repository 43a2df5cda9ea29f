//! Parses `res`/`vp`/`ua` tracker parameters into a `device_info` context.
//! User-agent parsing uses `woothee`, which gives coarser family/version
//! detail than the Python reference's `ua_parser`, but the same shape.

use async_trait::async_trait;
use atomic::{SelfDescribingContext, TemporaryAtomicEvent};
use woothee::parser::Parser;

use crate::{EnrichError, Enrichment};

const SCHEMA: &str = "iglu:io.datenstrom/device_info/jsonschema/1-0-0";
const UNKNOWN: &str = "UNKNOWN";

pub struct DeviceEnrichment;

impl DeviceEnrichment {
    pub fn new() -> Self {
        DeviceEnrichment
    }
}

impl Default for DeviceEnrichment {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Enrichment for DeviceEnrichment {
    async fn enrich(&self, event: &mut TemporaryAtomicEvent) -> Result<(), EnrichError> {
        let mut context = serde_json::Map::new();

        if let Some(res) = event.get_str("res") {
            context.insert("screen_resolution".to_string(), res.into());
        }
        if let Some(vp) = event.get_str("vp") {
            context.insert("viewport_resolution".to_string(), vp.into());
        }

        if let Some(ua) = event.get_str("ua") {
            if let Some(parsed) = Parser::new().parse(ua) {
                let browser_known = parsed.name != UNKNOWN;
                let os_known = parsed.os != UNKNOWN;
                let device_known = parsed.category != UNKNOWN;
                if browser_known || os_known || device_known {
                    context.insert("browser_family".to_string(), parsed.name.into());
                    context.insert("browser_version".to_string(), parsed.version.into());
                    context.insert("os_family".to_string(), parsed.os.into());
                    context.insert("os_version".to_string(), parsed.os_version.to_string().into());
                    context.insert("device_family".to_string(), parsed.category.into());
                }
            }
        }

        if !context.is_empty() {
            event.add_context(SelfDescribingContext {
                schema: SCHEMA.to_string(),
                data: serde_json::Value::Object(context),
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use wire_codec::CollectorPayload;

    fn event_with(key: &str, value: &str) -> TemporaryAtomicEvent {
        let raw = Arc::new(CollectorPayload::default());
        let mut event = TemporaryAtomicEvent::new(raw);
        event.set_short(key, value);
        event
    }

    #[tokio::test]
    async fn test_recognized_user_agent_produces_a_context() {
        let mut event = event_with(
            "ua",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
        );
        DeviceEnrichment::new().enrich(&mut event).await.unwrap();
        assert_eq!(event.contexts().len(), 1);
        assert_eq!(event.contexts()[0].data["browser_family"], "Chrome");
    }

    #[tokio::test]
    async fn test_gibberish_user_agent_adds_no_context() {
        let mut event = event_with("ua", "not-a-real-user-agent-string");
        DeviceEnrichment::new().enrich(&mut event).await.unwrap();
        assert!(event.contexts().is_empty());
    }
}

//! Extracts UTM and ad-network click-id parameters from `page_url`'s query
//! string into a `campaign_attribution` context.

use async_trait::async_trait;
use atomic::{SelfDescribingContext, TemporaryAtomicEvent};

use crate::{EnrichError, Enrichment};

const SCHEMA: &str = "iglu:io.datenstrom/campaign_attribution/jsonschema/1-0-0";

const CLICK_ID_MAP: &[(&str, &str)] =
    &[("gclid", "google"), ("msclkid", "bing"), ("fbclid", "facebook"), ("dclid", "doubleclick")];

pub struct CampaignEnrichment;

impl CampaignEnrichment {
    pub fn new() -> Self {
        CampaignEnrichment
    }
}

impl Default for CampaignEnrichment {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Enrichment for CampaignEnrichment {
    async fn enrich(&self, event: &mut TemporaryAtomicEvent) -> Result<(), EnrichError> {
        let Some(page_url) = event.get_str("page_url") else {
            return Ok(());
        };
        let Ok(url) = url::Url::parse(page_url) else {
            return Ok(());
        };

        // First occurrence wins per key, matching `urllib.parse.parse_qs()[k][0]`.
        let mut query = std::collections::HashMap::new();
        for (k, v) in url.query_pairs() {
            query.entry(k.into_owned()).or_insert_with(|| v.into_owned());
        }
        if query.is_empty() {
            return Ok(());
        }

        let mut context = serde_json::Map::new();
        for (param, field) in [
            ("utm_campaign", "campaign"),
            ("utm_source", "source"),
            ("utm_medium", "medium"),
            ("utm_term", "term"),
            ("utm_content", "content"),
        ] {
            if let Some(v) = query.get(param) {
                context.insert(field.to_string(), serde_json::Value::String(v.clone()));
            }
        }

        for (click_id, network) in CLICK_ID_MAP {
            if let Some(v) = query.get(*click_id) {
                context.insert("network".to_string(), serde_json::Value::String(network.to_string()));
                context.insert("click_id".to_string(), serde_json::Value::String(v.clone()));
                break;
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

    fn event_with_url(url: &str) -> TemporaryAtomicEvent {
        let raw = Arc::new(CollectorPayload::default());
        let mut event = TemporaryAtomicEvent::new(raw);
        event.set_short("page_url", url);
        event
    }

    #[tokio::test]
    async fn test_extracts_utm_parameters() {
        let mut event =
            event_with_url("https://example.com/?utm_source=newsletter&utm_medium=email&utm_campaign=spring");
        CampaignEnrichment::new().enrich(&mut event).await.unwrap();
        let ctx = event.contexts();
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx[0].data["source"], "newsletter");
        assert_eq!(ctx[0].data["medium"], "email");
        assert_eq!(ctx[0].data["campaign"], "spring");
    }

    #[tokio::test]
    async fn test_first_matching_click_id_wins() {
        let mut event = event_with_url("https://example.com/?gclid=abc&fbclid=def");
        CampaignEnrichment::new().enrich(&mut event).await.unwrap();
        let ctx = event.contexts();
        assert_eq!(ctx[0].data["network"], "google");
        assert_eq!(ctx[0].data["click_id"], "abc");
    }

    #[tokio::test]
    async fn test_no_query_string_adds_no_context() {
        let mut event = event_with_url("https://example.com/");
        CampaignEnrichment::new().enrich(&mut event).await.unwrap();
        assert!(event.contexts().is_empty());
    }
}

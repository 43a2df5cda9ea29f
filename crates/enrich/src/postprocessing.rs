//! Final pass: fills in `event_id` if no enrichment set one, resolves the
//! canonical `tstamp` from whichever timestamp fields are available, stamps
//! `etl_tstamp`, and defaults `platform` to `web`.

use async_trait::async_trait;
use atomic::TemporaryAtomicEvent;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::{EnrichError, Enrichment};

fn parse_rfc3339(event: &TemporaryAtomicEvent, field: &str) -> Result<Option<OffsetDateTime>, EnrichError> {
    match event.get_value(field).and_then(|v| v.as_str()) {
        Some(s) => OffsetDateTime::parse(s, &Rfc3339)
            .map(Some)
            .map_err(|e| EnrichError::Invalid(format!("invalid {field}: {e}"))),
        None => Ok(None),
    }
}

fn to_rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).expect("rfc3339 formats")
}

pub struct PostProcessingEnrichment;

impl PostProcessingEnrichment {
    pub fn new() -> Self {
        PostProcessingEnrichment
    }
}

impl Default for PostProcessingEnrichment {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Enrichment for PostProcessingEnrichment {
    async fn enrich(&self, event: &mut TemporaryAtomicEvent) -> Result<(), EnrichError> {
        if !event.has_value("event_id") {
            event.set_value("event_id", uuid::Uuid::new_v4().to_string())?;
        }

        let true_tstamp = parse_rfc3339(event, "true_tstamp")?;
        let dvce_created = parse_rfc3339(event, "dvce_created_tstamp")?;
        let dvce_sent = parse_rfc3339(event, "dvce_sent_tstamp")?;
        let collector_tstamp = parse_rfc3339(event, "collector_tstamp")?;

        let tstamp = if let Some(true_tstamp) = true_tstamp {
            true_tstamp
        } else if let (Some(created), Some(sent), Some(collector_tstamp)) =
            (dvce_created, dvce_sent, collector_tstamp)
        {
            let delta = sent - created;
            collector_tstamp - delta
        } else if let Some(collector_tstamp) = collector_tstamp {
            collector_tstamp
        } else {
            return Err(EnrichError::Invalid(
                "no collector_tstamp to derive tstamp from".to_string(),
            ));
        };
        event.set_value("tstamp", to_rfc3339(tstamp))?;
        event.set_value("etl_tstamp", to_rfc3339(OffsetDateTime::now_utc()))?;

        if !event.has_value("platform") {
            event.set_value("platform", "web")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use wire_codec::CollectorPayload;

    fn base_event() -> TemporaryAtomicEvent {
        let raw = Arc::new(CollectorPayload::default());
        let mut event = TemporaryAtomicEvent::new(raw);
        event.set_value("collector_tstamp", "2024-01-01T00:00:00Z").unwrap();
        event
    }

    #[tokio::test]
    async fn test_generates_event_id_when_missing() {
        let mut event = base_event();
        PostProcessingEnrichment::new().enrich(&mut event).await.unwrap();
        assert!(event.get_value("event_id").unwrap().as_str().unwrap().len() == 36);
    }

    #[tokio::test]
    async fn test_defaults_platform_to_web() {
        let mut event = base_event();
        PostProcessingEnrichment::new().enrich(&mut event).await.unwrap();
        assert_eq!(event.get_value("platform").unwrap().as_str(), Some("web"));
    }

    #[tokio::test]
    async fn test_prefers_true_tstamp_over_collector_tstamp() {
        let mut event = base_event();
        event.set_value("true_tstamp", "2023-06-01T00:00:00Z").unwrap();
        PostProcessingEnrichment::new().enrich(&mut event).await.unwrap();
        assert_eq!(event.get_value("tstamp").unwrap().as_str(), Some("2023-06-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_derives_tstamp_from_device_clock_offset() {
        let mut event = base_event();
        event.set_value("dvce_created_tstamp", "2024-01-01T00:00:00Z").unwrap();
        event.set_value("dvce_sent_tstamp", "2024-01-01T00:00:05Z").unwrap();
        PostProcessingEnrichment::new().enrich(&mut event).await.unwrap();
        // 5s ahead on the device clock -> subtract 5s from collector_tstamp.
        assert_eq!(event.get_value("tstamp").unwrap().as_str(), Some("2023-12-31T23:59:55Z"));
    }
}

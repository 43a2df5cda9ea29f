//! Stamps every candidate event with collector/ETL identity: `v_etl`,
//! `v_collector`, `collector_tstamp`, `collector_host`.

use async_trait::async_trait;
use atomic::TemporaryAtomicEvent;

use crate::transform::transform_tstamp;
use crate::{EnrichError, Enrichment};

pub struct ProcessingInfoEnrichment;

impl ProcessingInfoEnrichment {
    pub fn new() -> Self {
        ProcessingInfoEnrichment
    }
}

impl Default for ProcessingInfoEnrichment {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Enrichment for ProcessingInfoEnrichment {
    async fn enrich(&self, event: &mut TemporaryAtomicEvent) -> Result<(), EnrichError> {
        let collector = event.raw_event().collector.clone();
        let timestamp = event.raw_event().timestamp;
        let hostname = event.raw_event().hostname.clone();

        event.set_value("v_etl", format!("datenstrom-rs-{}", env!("CARGO_PKG_VERSION")))?;
        event.set_value("v_collector", collector)?;
        let collector_tstamp = transform_tstamp(timestamp)?;
        event.set_value(
            "collector_tstamp",
            collector_tstamp
                .format(&time::format_description::well_known::Rfc3339)
                .expect("rfc3339 formats"),
        )?;
        if let Some(hostname) = &hostname {
            event.set_value("collector_host", hostname.clone())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use wire_codec::CollectorPayload;

    #[tokio::test]
    async fn test_sets_collector_identity_fields() {
        let raw = Arc::new(CollectorPayload {
            collector: "ssc-2.5.0".to_string(),
            timestamp: 1_700_000_000_000,
            hostname: Some("collector.example.com".to_string()),
            ..Default::default()
        });
        let mut event = TemporaryAtomicEvent::new(raw);
        ProcessingInfoEnrichment::new().enrich(&mut event).await.unwrap();

        assert_eq!(event.get_value("v_collector").unwrap().as_str(), Some("ssc-2.5.0"));
        assert_eq!(event.get_value("collector_host").unwrap().as_str(), Some("collector.example.com"));
        assert!(event.get_value("collector_tstamp").is_some());
    }
}

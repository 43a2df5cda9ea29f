//! Redacts the last octet of `user_ipaddress` unless full IPs are enabled
//! for the tenant that produced this raw payload (per-hostname remote
//! config, not a global switch).

use async_trait::async_trait;
use atomic::TemporaryAtomicEvent;

use crate::{EnrichError, Enrichment};

const REDACTED_OCTETS: usize = 3;

fn redact_ip(ip: &str) -> String {
    let parts: Vec<&str> = ip.split('.').collect();
    if parts.len() != 4 {
        return ip.to_string();
    }
    let mut out = parts[..REDACTED_OCTETS].join(".");
    out.push_str(".x");
    out
}

pub struct PiiEnrichment {
    enable_full_ip: bool,
}

impl PiiEnrichment {
    pub fn new(enable_full_ip: bool) -> Self {
        PiiEnrichment { enable_full_ip }
    }
}

#[async_trait]
impl Enrichment for PiiEnrichment {
    async fn enrich(&self, event: &mut TemporaryAtomicEvent) -> Result<(), EnrichError> {
        if self.enable_full_ip {
            return Ok(());
        }
        if let Some(ip) = event.get_value("user_ipaddress").and_then(|v| v.as_str()) {
            let redacted = redact_ip(ip);
            event.set_value("user_ipaddress", redacted)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use wire_codec::CollectorPayload;

    fn event_with_ip(ip: &str) -> TemporaryAtomicEvent {
        let raw = Arc::new(CollectorPayload::default());
        let mut event = TemporaryAtomicEvent::new(raw);
        event.set_value("user_ipaddress", ip).unwrap();
        event
    }

    #[tokio::test]
    async fn test_redacts_last_octet_by_default() {
        let mut event = event_with_ip("203.0.113.42");
        PiiEnrichment::new(false).enrich(&mut event).await.unwrap();
        assert_eq!(event.get_value("user_ipaddress").unwrap().as_str(), Some("203.0.113.x"));
    }

    #[tokio::test]
    async fn test_full_ip_disables_redaction() {
        let mut event = event_with_ip("203.0.113.42");
        PiiEnrichment::new(true).enrich(&mut event).await.unwrap();
        assert_eq!(event.get_value("user_ipaddress").unwrap().as_str(), Some("203.0.113.42"));
    }
}

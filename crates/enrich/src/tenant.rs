//! Resolves the tenant that owns a raw payload's collector hostname via an
//! optional lookup endpoint, and stamps `tenant_id` when one is found.
//!
//! Successful lookups are remembered permanently per hostname (tenants don't
//! move collectors often); the underlying HTTP call itself is cached for
//! 60 seconds, including failures, so a misconfigured or slow lookup
//! endpoint doesn't get hammered once per event.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use atomic::TemporaryAtomicEvent;
use moka::sync::Cache;
use url::Url;

use crate::{EnrichError, Enrichment};

const REQUEST_CACHE_TTL: Duration = Duration::from_secs(60);
const REQUEST_CACHE_CAPACITY: u64 = 128;

pub struct TenantEnrichment {
    endpoint: Option<Url>,
    client: reqwest::Client,
    hostname_lookup: Mutex<std::collections::HashMap<String, String>>,
    request_cache: Cache<String, Option<String>>,
}

impl TenantEnrichment {
    pub fn new(endpoint: Option<Url>) -> Self {
        TenantEnrichment {
            endpoint,
            client: reqwest::Client::new(),
            hostname_lookup: Mutex::new(std::collections::HashMap::new()),
            request_cache: Cache::builder()
                .max_capacity(REQUEST_CACHE_CAPACITY)
                .time_to_live(REQUEST_CACHE_TTL)
                .build(),
        }
    }

    async fn lookup_hostname(&self, hostname: &str) -> Option<String> {
        let lower = hostname.to_lowercase();
        if let Some(tenant) = self.hostname_lookup.lock().expect("lock not poisoned").get(&lower) {
            return Some(tenant.clone());
        }

        let endpoint = self.endpoint.as_ref()?;
        let mut url = endpoint.clone();
        url.query_pairs_mut().append_pair("hostname", hostname);
        let tenant = self.make_request(url).await?;
        self.hostname_lookup
            .lock()
            .expect("lock not poisoned")
            .insert(lower, tenant.clone());
        Some(tenant)
    }

    async fn make_request(&self, url: Url) -> Option<String> {
        let key = url.to_string();
        if let Some(cached) = self.request_cache.get(&key) {
            return cached;
        }
        let result = self.fetch(&url).await;
        self.request_cache.insert(key, result.clone());
        result
    }

    async fn fetch(&self, url: &Url) -> Option<String> {
        let response = match self.client.get(url.clone()).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(%url, error = %e, "tenant lookup request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(%url, status = %response.status(), "tenant lookup request failed");
            return None;
        }
        match response.json::<serde_json::Value>().await {
            Ok(body) => match body.get("tenant").and_then(|v| v.as_str()) {
                Some(tenant) => Some(tenant.to_string()),
                None => {
                    tracing::warn!(%url, "tenant lookup response missing `tenant` key");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(%url, error = %e, "tenant lookup response was not valid json");
                None
            }
        }
    }
}

#[async_trait]
impl Enrichment for TenantEnrichment {
    async fn enrich(&self, event: &mut TemporaryAtomicEvent) -> Result<(), EnrichError> {
        let Some(hostname) = event.raw_event().hostname.clone() else {
            return Ok(());
        };
        if let Some(tenant) = self.lookup_hostname(&hostname).await {
            event.set_value("tenant_id", tenant)?;
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
    async fn test_no_endpoint_configured_leaves_tenant_id_unset() {
        let raw = Arc::new(CollectorPayload {
            hostname: Some("collector.example.com".to_string()),
            ..Default::default()
        });
        let mut event = TemporaryAtomicEvent::new(raw);
        TenantEnrichment::new(None).enrich(&mut event).await.unwrap();
        assert!(event.get_value("tenant_id").is_none());
    }

    #[tokio::test]
    async fn test_missing_hostname_is_a_noop() {
        let raw = Arc::new(CollectorPayload::default());
        let mut event = TemporaryAtomicEvent::new(raw);
        let enrichment = TenantEnrichment::new(Some(Url::parse("http://127.0.0.1:1/tenant").unwrap()));
        enrichment.enrich(&mut event).await.unwrap();
        assert!(event.get_value("tenant_id").is_none());
    }
}

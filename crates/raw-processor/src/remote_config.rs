//! Fetches per-hostname runtime config (`enable_full_ip`, `enable_cookies`)
//! from an optional remote endpoint. Mirrors [`enrich::TenantEnrichment`]'s
//! cached-lookup shape, but keeps two caches with separate TTLs — a longer
//! one for hostnames that resolved, a shorter one for hostnames that didn't
//! — matching `Config::default_cache_ttl`/`Config::none_cache_ttl`.

use std::time::Duration;

use moka::sync::Cache;
use serde::Deserialize;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const CACHE_CAPACITY: u64 = 1024;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub enable_full_ip: bool,
    #[serde(default)]
    pub enable_cookies: bool,
}

pub struct RemoteConfigFetcher {
    endpoint: Option<Url>,
    client: reqwest::Client,
    found: Cache<String, RemoteConfig>,
    not_found: Cache<String, ()>,
}

impl RemoteConfigFetcher {
    pub fn new(endpoint: Option<Url>, default_cache_ttl: Duration, none_cache_ttl: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client builds");
        RemoteConfigFetcher {
            endpoint,
            client,
            found: Cache::builder().max_capacity(CACHE_CAPACITY).time_to_live(default_cache_ttl).build(),
            not_found: Cache::builder().max_capacity(CACHE_CAPACITY).time_to_live(none_cache_ttl).build(),
        }
    }

    pub async fn fetch(&self, hostname: &str) -> RemoteConfig {
        let key = hostname.to_lowercase();
        if let Some(cached) = self.found.get(&key) {
            return cached;
        }
        if self.not_found.get(&key).is_some() {
            return RemoteConfig::default();
        }

        let Some(endpoint) = &self.endpoint else {
            return RemoteConfig::default();
        };
        let mut url = endpoint.clone();
        url.query_pairs_mut().append_pair("hostname", hostname);

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%url, error = %e, "remote config request failed");
                self.not_found.insert(key, ());
                return RemoteConfig::default();
            }
        };
        if !response.status().is_success() {
            tracing::warn!(%url, status = %response.status(), "remote config request failed");
            self.not_found.insert(key, ());
            return RemoteConfig::default();
        }

        match response.json::<RemoteConfig>().await {
            Ok(config) => {
                self.found.insert(key, config);
                config
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "remote config response was not valid json");
                self.not_found.insert(key, ());
                RemoteConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_no_endpoint_configured_returns_defaults() {
        let fetcher = RemoteConfigFetcher::new(None, Duration::from_secs(3600), Duration::from_secs(300));
        let config = fetcher.fetch("collector.example.com").await;
        assert!(!config.enable_full_ip);
        assert!(!config.enable_cookies);
    }
}

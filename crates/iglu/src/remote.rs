use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use url::Url;

use crate::error::IgluError;
use crate::reference::IgluReference;
use crate::schema::{compile_remote, SchemaEntry};

const MAX_SCHEMA_SIZE_BYTES: u64 = 128 * 1024;

#[derive(Clone)]
enum Cached {
    Hit(Arc<SchemaEntry>),
    Miss,
}

/// One HTTP-backed Iglu registry. `GET {base}/{vendor}/{name}/{format}/{version}`.
/// Successes and negative (not-found / oversized / invalid) results are cached
/// separately, each with its own TTL, so a misbehaving registry cannot be
/// hammered once it has failed once.
pub struct RemoteRegistry {
    base_url: Url,
    client: reqwest::Client,
    cache: Cache<String, Cached>,
}

impl RemoteRegistry {
    pub fn new(base_url: Url, positive_ttl: Duration, negative_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1024)
            .expire_after(ExpiryByOutcome { positive_ttl, negative_ttl })
            .build();
        RemoteRegistry {
            base_url,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("reqwest client builds with a fixed timeout"),
            cache,
        }
    }

    pub async fn get(&self, reference: &IgluReference) -> Result<Option<Arc<SchemaEntry>>, IgluError> {
        let key = reference.to_string();
        if let Some(cached) = self.cache.get(&key) {
            return Ok(match cached {
                Cached::Hit(entry) => Some(entry),
                Cached::Miss => None,
            });
        }

        let result = self.fetch(reference).await;
        match result {
            Ok(Some(entry)) => {
                self.cache.insert(key, Cached::Hit(entry.clone()));
                Ok(Some(entry))
            }
            Ok(None) => {
                self.cache.insert(key, Cached::Miss);
                Ok(None)
            }
            Err(e) => {
                self.cache.insert(key, Cached::Miss);
                Err(e)
            }
        }
    }

    async fn fetch(&self, reference: &IgluReference) -> Result<Option<Arc<SchemaEntry>>, IgluError> {
        let url = self
            .base_url
            .join(&reference.to_path())
            .map_err(|e| IgluError::InvalidSchema {
                reference: reference.clone(),
                reason: format!("invalid registry URL: {e}"),
            })?;
        tracing::debug!(%url, "fetching iglu schema");

        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(reference = %reference, error = %e, "transient error fetching schema");
                return Ok(None);
            }
        };
        if !response.status().is_success() {
            return Ok(None);
        }
        if let Some(len) = response.content_length() {
            if len > MAX_SCHEMA_SIZE_BYTES {
                return Err(IgluError::InvalidSchema {
                    reference: reference.clone(),
                    reason: format!("schema too large: {len} bytes"),
                });
            }
        }
        let body: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(reference = %reference, error = %e, "malformed schema response");
                return Ok(None);
            }
        };
        Ok(Some(Arc::new(compile_remote(reference, body)?)))
    }
}

struct ExpiryByOutcome {
    positive_ttl: Duration,
    negative_ttl: Duration,
}

impl moka::Expiry<String, Cached> for ExpiryByOutcome {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Cached,
        _current_time: std::time::Instant,
    ) -> Option<Duration> {
        Some(match value {
            Cached::Hit(_) => self.positive_ttl,
            Cached::Miss => self.negative_ttl,
        })
    }
}

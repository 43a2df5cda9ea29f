use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use url::Url;

use crate::error::IgluError;
use crate::hardcoded::HardcodedRegistry;
use crate::reference::IgluReference;
use crate::remote::RemoteRegistry;
use crate::schema::SchemaEntry;

/// Resolves an Iglu reference to a validator, consulting the hardcoded
/// registry first and then each remote registry in configured order.
/// First hit wins. The combined result is memoised for the lifetime of the
/// process in a small fixed-size LRU, independent of each remote registry's
/// own TTL cache.
pub struct SchemaRegistry {
    hardcoded: HardcodedRegistry,
    remotes: Vec<RemoteRegistry>,
    memo: Cache<String, Option<Arc<SchemaEntry>>>,
}

impl SchemaRegistry {
    pub fn new(
        remote_urls: &[Url],
        positive_ttl: Duration,
        negative_ttl: Duration,
    ) -> Result<Self, IgluError> {
        if remote_urls.is_empty() {
            return Err(IgluError::InvalidReference {
                reason: "no iglu schema registries configured".to_string(),
            });
        }
        let remotes = remote_urls
            .iter()
            .map(|url| RemoteRegistry::new(url.clone(), positive_ttl, negative_ttl))
            .collect();
        Ok(SchemaRegistry {
            hardcoded: HardcodedRegistry::new(),
            remotes,
            memo: Cache::new(100),
        })
    }

    pub async fn get(&self, schema: &str) -> Result<Arc<SchemaEntry>, IgluError> {
        let reference = IgluReference::from_string(schema)?;
        let key = reference.to_string();
        if let Some(memoised) = self.memo.get(&key) {
            return memoised.ok_or_else(|| IgluError::SchemaNotFound(reference.clone()));
        }

        let resolved = self.resolve(&reference).await?;
        self.memo.insert(key, resolved.clone());
        resolved.ok_or(IgluError::SchemaNotFound(reference))
    }

    async fn resolve(&self, reference: &IgluReference) -> Result<Option<Arc<SchemaEntry>>, IgluError> {
        if let Some(entry) = self.hardcoded.get(reference)? {
            return Ok(Some(entry));
        }
        for remote in &self.remotes {
            if let Some(entry) = remote.get(reference).await? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    pub async fn validate(&self, schema: &str, data: &serde_json::Value) -> Result<(), IgluError> {
        self.get(schema).await?.validate(data)
    }

    pub async fn is_valid(&self, schema: &str, data: &serde_json::Value) -> Result<bool, IgluError> {
        Ok(self.get(schema).await?.is_valid(data))
    }

    pub async fn fields(&self, schema: &str) -> Result<Vec<String>, IgluError> {
        Ok(self.get(schema).await?.fields())
    }

    pub async fn parts(&self, schema: &str) -> Result<IgluReference, IgluError> {
        Ok(self.get(schema).await?.reference.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn registry() -> SchemaRegistry {
        // Port 1 is never listening; remote lookups fail fast with a
        // connection error rather than depending on real network access.
        SchemaRegistry::new(
            &[Url::parse("http://127.0.0.1:1/").unwrap()],
            Duration::from_secs(3600),
            Duration::from_secs(60),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_resolves_hardcoded_schema_without_network() {
        let registry = registry();
        let entry = registry
            .get("iglu:io.datenstrom/page_view/jsonschema/1-0-0")
            .await
            .unwrap();
        assert_eq!(entry.fields(), vec!["page_url", "page_title", "page_referrer"].iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_validate_rejects_missing_required_field() {
        let registry = registry();
        let err = registry
            .validate(
                "iglu:io.datenstrom/page_view/jsonschema/1-0-0",
                &serde_json::json!({"page_title": "hi"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IgluError::ValidationFailed { .. }));
    }

    #[tokio::test]
    async fn test_unknown_vendor_is_schema_not_found() {
        let registry = registry();
        let err = registry
            .get("iglu:com.unknown.vendor/widget/jsonschema/1-0-0")
            .await
            .unwrap_err();
        assert!(matches!(err, IgluError::SchemaNotFound(_)));
    }

    #[test]
    fn test_rejects_empty_registry_list() {
        assert!(SchemaRegistry::new(&[], Duration::from_secs(1), Duration::from_secs(1)).is_err());
    }
}

//! Turns one raw tracker payload into its validated [`atomic::AtomicEvent`]s.
//!
//! A single raw payload can expand into several candidate events (a batched
//! `payload_data` POST body carries one per tracked action); every candidate
//! runs through the same fixed [`enrich::Chain`] plus a final PII pass. If
//! any candidate fails, the whole raw payload is rejected — no partial
//! success, matching the observed behaviour this was ported from.

mod error;
mod remote_config;

pub use error::ProcessError;
pub use remote_config::{RemoteConfig, RemoteConfigFetcher};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use atomic::{AtomicEvent, TemporaryAtomicEvent};
use config::Config;
use enrich::{
    schema_for_event_type, AuthenticationEnrichment, CampaignEnrichment, Chain, ContextExtractionEnrichment,
    DeviceEnrichment, EventExtractionEnrichment, GeoIpEnrichment, PiiEnrichment, PostProcessingEnrichment,
    ProcessingInfoEnrichment, TenantEnrichment, TransformEnrichment,
};
use iglu::SchemaRegistry;
use wire_codec::CollectorPayload;

/// Every Snowplow `payload_data` schema version starts with this prefix;
/// the trailing `ADD-MOD-PATCH` segment is allowed to vary.
const PAYLOAD_DATA_SCHEMA_PREFIX: &str = "iglu:com.snowplowanalytics.snowplow/payload_data/jsonschema/1";

pub struct RawProcessor {
    registry: Arc<SchemaRegistry>,
    chain: Chain,
    remote_config: RemoteConfigFetcher,
}

impl RawProcessor {
    pub fn new(config: &Config) -> Result<Self, ProcessError> {
        let registry = Arc::new(SchemaRegistry::new(
            &config.iglu_schema_registries,
            Duration::from_secs(config.default_cache_ttl),
            Duration::from_secs(config.none_cache_ttl),
        )?);

        let mut chain = Chain::new();
        chain.push(Box::new(ProcessingInfoEnrichment::new()));
        chain.push(Box::new(TransformEnrichment::new()));
        chain.push(Box::new(EventExtractionEnrichment::new(registry.clone())));
        chain.push(Box::new(ContextExtractionEnrichment::new(registry.clone())));
        chain.push(Box::new(TenantEnrichment::new(config.tenant_lookup_endpoint.clone())));
        if config.geoip_enabled {
            let db_path = config.asset_dir.join(&config.geoip_db_file);
            chain.push(Box::new(GeoIpEnrichment::open(db_path)?));
        }
        if config.campaign_enrichment_enabled {
            chain.push(Box::new(CampaignEnrichment::new()));
        }
        if config.device_enrichment_enabled {
            chain.push(Box::new(DeviceEnrichment::new()));
        }
        chain.push(Box::new(AuthenticationEnrichment::new(
            config.authentication_sub_field.clone(),
            config.authentication_aud.clone(),
            config.authentication_iss_jwk_urls.clone(),
            config.authentication_public_key.clone(),
        )));
        chain.push(Box::new(PostProcessingEnrichment::new()));

        let remote_config = RemoteConfigFetcher::new(
            config.remote_config_endpoint.clone(),
            Duration::from_secs(config.default_cache_ttl),
            Duration::from_secs(config.none_cache_ttl),
        );

        Ok(RawProcessor { registry, chain, remote_config })
    }

    pub async fn process(&self, raw: CollectorPayload) -> Result<Vec<AtomicEvent>, ProcessError> {
        let remote_config = match &raw.hostname {
            Some(hostname) => self.remote_config.fetch(hostname).await,
            None => RemoteConfig::default(),
        };

        let mut base = HashMap::new();
        if !raw.ip_address.is_empty() {
            base.insert("ip".to_string(), serde_json::Value::String(raw.ip_address.clone()));
        }
        if let Some(ua) = &raw.user_agent {
            base.insert("ua".to_string(), serde_json::Value::String(ua.clone()));
        }
        if let Some(nuid) = &raw.network_user_id {
            base.insert("nuid".to_string(), serde_json::Value::String(nuid.clone()));
        }

        if let Some(qs) = &raw.querystring {
            for (k, v) in url::form_urlencoded::parse(qs.as_bytes()) {
                base.insert(k.into_owned(), serde_json::Value::String(v.into_owned()));
            }
        }

        set_schema_from_event_type(&mut base)?;

        let candidates = self.extract_events_from_body(&raw, &base).await?;

        let raw = Arc::new(raw);
        let mut events = Vec::with_capacity(candidates.len());
        for mut candidate in candidates {
            set_schema_from_event_type(&mut candidate)?;

            let mut scratchpad = TemporaryAtomicEvent::new(raw.clone());
            for (key, value) in candidate {
                scratchpad.set_short(key, value);
            }

            self.chain.run(&mut scratchpad).await?;
            PiiEnrichment::new(remote_config.enable_full_ip).enrich(&mut scratchpad).await?;

            let atomic = scratchpad.to_atomic_event(&self.registry).await?;
            events.push(atomic);
        }

        Ok(events)
    }

    /// Implements §4.5 step 4 (body expansion). `base` supplies the schema
    /// already resolved from the query string, if any, and is merged under
    /// every candidate so per-event fields win on conflicting keys.
    async fn extract_events_from_body(
        &self,
        raw: &CollectorPayload,
        base: &HashMap<String, serde_json::Value>,
    ) -> Result<Vec<HashMap<String, serde_json::Value>>, ProcessError> {
        let Some(body) = raw.body.as_ref().filter(|b| !b.is_empty()) else {
            return Ok(vec![base.clone()]);
        };

        if let Some(content_type) = &raw.content_type {
            if content_type.contains("application/x-www-form-urlencoded") {
                return Err(ProcessError::UnsupportedContentType);
            }
        }

        let data: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| ProcessError::InvalidBody(e.to_string()))?;
        let object = data
            .as_object()
            .ok_or_else(|| ProcessError::InvalidBody("body is not a json object".to_string()))?;

        if let Some(schema) = object.get("schema").and_then(|v| v.as_str()) {
            if schema.starts_with(PAYLOAD_DATA_SCHEMA_PREFIX) {
                let items = object
                    .get("data")
                    .ok_or_else(|| ProcessError::InvalidBody("missing data in body".to_string()))?;
                self.registry.validate(schema, items).await?;
                let items = items
                    .as_array()
                    .ok_or_else(|| ProcessError::InvalidBody("payload_data data is not an array".to_string()))?;
                return Ok(items
                    .iter()
                    .map(|item| {
                        let mut merged = base.clone();
                        if let Some(item) = item.as_object() {
                            for (k, v) in item {
                                merged.insert(k.clone(), v.clone());
                            }
                        }
                        merged
                    })
                    .collect());
            }
        }

        if let Some(schema) = base.get("schema").and_then(|v| v.as_str()) {
            self.registry.validate(schema, &data).await?;
            let mut merged = base.clone();
            merged.insert("schema".to_string(), serde_json::Value::String(schema.to_string()));
            merged.insert("event".to_string(), data);
            return Ok(vec![merged]);
        }

        let schema = object
            .get("schema")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProcessError::InvalidBody("missing schema in body".to_string()))?
            .to_string();
        let event = object
            .get("data")
            .ok_or_else(|| ProcessError::InvalidBody("missing data in body".to_string()))?
            .clone();
        let mut merged = base.clone();
        merged.insert("schema".to_string(), serde_json::Value::String(schema));
        merged.insert("event".to_string(), event);
        Ok(vec![merged])
    }
}

/// If the candidate carries an `e` (event-type) short code, (re)derives
/// `schema` from it — `ue` leaves `schema` untouched since the inner
/// unstruct-event envelope supplies it instead.
fn set_schema_from_event_type(candidate: &mut HashMap<String, serde_json::Value>) -> Result<(), ProcessError> {
    let Some(event_type) = candidate.get("e").and_then(|v| v.as_str()).map(str::to_string) else {
        return Ok(());
    };
    if event_type == "ue" {
        return Ok(());
    }
    let schema = schema_for_event_type(&event_type)?;
    candidate.insert("schema".to_string(), serde_json::Value::String(schema.to_string()));
    Ok(())
}

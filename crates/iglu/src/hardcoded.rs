use std::collections::HashMap;
use std::sync::Arc;

use crate::error::IgluError;
use crate::reference::IgluReference;
use crate::schema::{compile_trusted, SchemaEntry};

const PAYLOAD_DATA: &str = include_str!("../schemas/payload_data.json");
const CONTEXTS: &str = include_str!("../schemas/contexts.json");
const UNSTRUCT_EVENT: &str = include_str!("../schemas/unstruct_event.json");
const PAGE_VIEW: &str = include_str!("../schemas/page_view.json");
const PAGE_PING: &str = include_str!("../schemas/page_ping.json");
const STRUCTURED_EVENT: &str = include_str!("../schemas/structured_event.json");
const TRANSACTION: &str = include_str!("../schemas/transaction.json");
const TRANSACTION_ITEM: &str = include_str!("../schemas/transaction_item.json");
const CAMPAIGN_ATTRIBUTION: &str = include_str!("../schemas/campaign_attribution.json");
const DEVICE_INFO: &str = include_str!("../schemas/device_info.json");
const CLIENT_SESSION: &str = include_str!("../schemas/client_session.json");
const ATOMIC: &str = include_str!("../schemas/atomic.json");

/// Built into the binary: the Snowplow protocol envelopes plus this system's
/// own event/context/atomic schemas. Consulted before any remote registry.
pub struct HardcodedRegistry {
    schemas: HashMap<&'static str, &'static str>,
}

impl HardcodedRegistry {
    pub fn new() -> Self {
        let mut schemas = HashMap::new();
        schemas.insert("com.snowplowanalytics.snowplow/payload_data/jsonschema/1-0-0", PAYLOAD_DATA);
        schemas.insert("com.snowplowanalytics.snowplow/payload_data/jsonschema/1-0-1", PAYLOAD_DATA);
        schemas.insert("com.snowplowanalytics.snowplow/payload_data/jsonschema/1-0-2", PAYLOAD_DATA);
        schemas.insert("com.snowplowanalytics.snowplow/payload_data/jsonschema/1-0-3", PAYLOAD_DATA);
        schemas.insert("com.snowplowanalytics.snowplow/payload_data/jsonschema/1-0-4", PAYLOAD_DATA);
        schemas.insert("com.snowplowanalytics.snowplow/unstruct_event/jsonschema/1-0-0", UNSTRUCT_EVENT);
        schemas.insert("com.snowplowanalytics.snowplow/contexts/jsonschema/1-0-0", CONTEXTS);
        schemas.insert("com.snowplowanalytics.snowplow/contexts/jsonschema/1-0-1", CONTEXTS);
        schemas.insert("io.datenstrom/page_view/jsonschema/1-0-0", PAGE_VIEW);
        schemas.insert("io.datenstrom/page_ping/jsonschema/1-0-0", PAGE_PING);
        schemas.insert("io.datenstrom/structured_event/jsonschema/1-0-0", STRUCTURED_EVENT);
        schemas.insert("io.datenstrom/transaction/jsonschema/1-0-0", TRANSACTION);
        schemas.insert("io.datenstrom/transaction_item/jsonschema/1-0-0", TRANSACTION_ITEM);
        schemas.insert("io.datenstrom/campaign_attribution/jsonschema/1-0-0", CAMPAIGN_ATTRIBUTION);
        schemas.insert("io.datenstrom/device_info/jsonschema/1-0-0", DEVICE_INFO);
        schemas.insert("io.datenstrom/client_session/jsonschema/1-0-0", CLIENT_SESSION);
        HardcodedRegistry { schemas }
    }

    pub fn get(&self, reference: &IgluReference) -> Result<Option<Arc<SchemaEntry>>, IgluError> {
        let path = reference.to_path();
        if path == "io.datenstrom/atomic/jsonschema/1-0-0" {
            let object: serde_json::Value =
                serde_json::from_str(ATOMIC).expect("embedded atomic schema is valid JSON");
            return Ok(Some(Arc::new(compile_trusted(reference, object)?)));
        }
        let Some(raw) = self.schemas.get(path.as_str()) else {
            return Ok(None);
        };
        let object: serde_json::Value =
            serde_json::from_str(raw).expect("embedded schema is valid JSON");
        Ok(Some(Arc::new(compile_trusted(reference, object)?)))
    }
}

impl Default for HardcodedRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resolves_payload_data_schema() {
        let registry = HardcodedRegistry::new();
        let reference = IgluReference::from_string(
            "iglu:com.snowplowanalytics.snowplow/payload_data/jsonschema/1-0-4",
        )
        .unwrap();
        let entry = registry.get(&reference).unwrap().unwrap();
        assert!(entry.is_valid(&serde_json::json!([{"tv": "x", "p": "web", "e": "pv"}])));
    }

    #[test]
    fn test_resolves_atomic_schema_by_special_cased_path() {
        let registry = HardcodedRegistry::new();
        let reference =
            IgluReference::from_string("iglu:io.datenstrom/atomic/jsonschema/1-0-0").unwrap();
        assert!(registry.get(&reference).unwrap().is_some());
    }

    #[test]
    fn test_unknown_schema_returns_none() {
        let registry = HardcodedRegistry::new();
        let reference =
            IgluReference::from_string("iglu:com.acme/widget/jsonschema/1-0-0").unwrap();
        assert!(registry.get(&reference).unwrap().is_none());
    }
}

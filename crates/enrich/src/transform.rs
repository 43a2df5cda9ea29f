//! Renames and type-coerces tracker-protocol short keys (`eid`, `dtm`, `ip`,
//! ...) onto their atomic-schema fields. Mirrors the Snowplow tracker
//! protocol's parameter table.

use async_trait::async_trait;
use atomic::TemporaryAtomicEvent;
use time::OffsetDateTime;

use crate::{EnrichError, Enrichment};

#[derive(Clone, Copy)]
enum Kind {
    Str,
    Ip,
    Int,
    Tstamp,
}

/// `(short key, atomic field, value kind)`. `aid` -> `app_id`.
const TRANSFORMATIONS: &[(&str, &str, Kind)] = &[
    ("eid", "event_id", Kind::Str),
    ("aid", "app_id", Kind::Str),
    ("p", "platform", Kind::Str),
    ("dtm", "dvce_created_tstamp", Kind::Tstamp),
    ("ttm", "true_tstamp", Kind::Tstamp),
    ("stm", "dvce_sent_tstamp", Kind::Tstamp),
    ("tv", "v_tracker", Kind::Str),
    ("cv", "v_collector", Kind::Str),
    ("tna", "name_tracker", Kind::Str),
    ("ip", "user_ipaddress", Kind::Ip),
    ("uid", "user_id", Kind::Str),
    ("duid", "domain_userid", Kind::Str),
    ("vid", "domain_sessionidx", Kind::Int),
    ("sid", "domain_sessionid", Kind::Str),
    ("nuid", "network_userid", Kind::Str),
    ("ua", "useragent", Kind::Str),
    ("lang", "language", Kind::Str),
];

/// Short keys renamed into other temp keys rather than atomic fields.
const TEMP_TRANSFORMATIONS: &[(&str, &str)] = &[("url", "page_url")];

/// `ip` carrying a comma-separated list (as seen behind some proxies) keeps
/// only the first address, stripped of the `[`/`]` IPv6-literal brackets.
pub fn transform_ip(ip: &str) -> String {
    if let Some((first, _)) = ip.split_once(',') {
        first.replace(['[', ']', ','], "")
    } else {
        ip.to_string()
    }
}

/// Tracker timestamps are milliseconds since the Unix epoch.
pub fn transform_tstamp(millis: i64) -> Result<OffsetDateTime, EnrichError> {
    OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000)
        .map_err(|e| EnrichError::Invalid(format!("invalid timestamp {millis}: {e}")))
}

fn transform_tstamp_str(value: &str) -> Result<OffsetDateTime, EnrichError> {
    let millis: i64 = value
        .parse()
        .map_err(|_| EnrichError::Invalid(format!("invalid timestamp value: {value}")))?;
    transform_tstamp(millis)
}

pub struct TransformEnrichment;

impl TransformEnrichment {
    pub fn new() -> Self {
        TransformEnrichment
    }
}

impl Default for TransformEnrichment {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Enrichment for TransformEnrichment {
    async fn enrich(&self, event: &mut TemporaryAtomicEvent) -> Result<(), EnrichError> {
        for key in event.temp_keys() {
            if let Some((_, atomic_field, kind)) =
                TRANSFORMATIONS.iter().find(|(k, _, _)| *k == key)
            {
                let Some(raw) = event.get_str(&key).map(str::to_string) else {
                    continue;
                };
                let value = match kind {
                    Kind::Ip => serde_json::Value::String(transform_ip(&raw)),
                    Kind::Str => serde_json::Value::String(raw),
                    Kind::Int => {
                        let parsed: i64 = raw
                            .parse()
                            .map_err(|_| EnrichError::Invalid(format!("invalid int value for {key}: {raw}")))?;
                        serde_json::Value::Number(parsed.into())
                    }
                    Kind::Tstamp => {
                        let ts = transform_tstamp_str(&raw)?;
                        serde_json::Value::String(
                            ts.format(&time::format_description::well_known::Rfc3339)
                                .expect("rfc3339 formats"),
                        )
                    }
                };
                event.set_value(*atomic_field, value)?;
            } else if let Some((_, new_key)) = TEMP_TRANSFORMATIONS.iter().find(|(k, _)| *k == key) {
                if let Some(value) = event.get(&key).cloned() {
                    event.set_short(*new_key, value);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use wire_codec::CollectorPayload;

    #[test]
    fn test_transform_ip_strips_proxy_chain_and_brackets() {
        assert_eq!(transform_ip("1.2.3.4"), "1.2.3.4");
        assert_eq!(transform_ip("[2001:db8::1], 10.0.0.1"), "2001:db8::1");
    }

    #[tokio::test]
    async fn test_enrich_renames_short_keys_onto_atomic_fields() {
        let raw = Arc::new(CollectorPayload::default());
        let mut event = TemporaryAtomicEvent::new(raw);
        event.set_short("eid", "11111111-1111-1111-1111-111111111111");
        event.set_short("aid", "my-app");
        event.set_short("ip", "203.0.113.5, 10.0.0.1");
        event.set_short("vid", "3");
        event.set_short("url", "https://example.com/");

        TransformEnrichment::new().enrich(&mut event).await.unwrap();

        assert_eq!(
            event.get_value("event_id").unwrap().as_str(),
            Some("11111111-1111-1111-1111-111111111111")
        );
        assert_eq!(event.get_value("app_id").unwrap().as_str(), Some("my-app"));
        assert_eq!(event.get_value("user_ipaddress").unwrap().as_str(), Some("203.0.113.5"));
        assert_eq!(event.get_value("domain_sessionidx").unwrap().as_i64(), Some(3));
        assert_eq!(event.get_str("page_url"), Some("https://example.com/"));
    }
}

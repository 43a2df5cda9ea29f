use serde::{Deserialize, Serialize};

/// `{schema, data}` — a self-describing event carried as `AtomicEvent.event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfDescribingEvent {
    #[serde(rename = "schema")]
    pub schema: String,
    pub data: serde_json::Value,
}

/// `{schema, data}` — one entry of `AtomicEvent.contexts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfDescribingContext {
    #[serde(rename = "schema")]
    pub schema: String,
    pub data: serde_json::Value,
}

/// The normalised downstream record produced by the enricher. Field names are
/// exactly those of the atomic JSON schema; `schema` stays `schema`, never
/// `schema_name`, on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicEvent {
    pub event_id: String,

    pub collector_host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collector_auth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    pub platform: String,

    pub event_vendor: String,
    pub event_name: String,
    pub event_version: String,

    #[serde(with = "time::serde::rfc3339")]
    pub tstamp: time::OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub collector_tstamp: time::OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none", default)]
    pub dvce_created_tstamp: Option<time::OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none", default)]
    pub dvce_sent_tstamp: Option<time::OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none", default)]
    pub true_tstamp: Option<time::OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub etl_tstamp: time::OffsetDateTime,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub v_tracker: Option<String>,
    pub v_collector: String,
    pub v_etl: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_tracker: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ipaddress: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_idx: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_userid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_sessionid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_sessionidx: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_userid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub useragent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default)]
    pub contexts: Vec<SelfDescribingContext>,
    pub event: SelfDescribingEvent,
}

/// Every field name `set_value` may target, i.e. every `AtomicEvent` field
/// except `contexts` and `event` which have their own dedicated operations.
pub const ATOMIC_FIELDS: &[&str] = &[
    "event_id",
    "collector_host",
    "collector_auth",
    "app_id",
    "platform",
    "event_vendor",
    "event_name",
    "event_version",
    "tstamp",
    "collector_tstamp",
    "dvce_created_tstamp",
    "dvce_sent_tstamp",
    "true_tstamp",
    "etl_tstamp",
    "v_tracker",
    "v_collector",
    "v_etl",
    "name_tracker",
    "user_ipaddress",
    "user_id",
    "session_id",
    "session_idx",
    "domain_userid",
    "domain_sessionid",
    "domain_sessionidx",
    "network_userid",
    "geo_country",
    "geo_region",
    "geo_city",
    "useragent",
    "language",
    "device_id",
    "tenant_id",
    "category",
    "action",
    "label",
    "property",
    "value",
];

//! Builds the [`wire_codec::CollectorPayload`] envelope for one request and
//! the anonymous-tracking/header/network-user-id rules that go with it —
//! ported from `collector/collect.py`'s `get_collector_payload` and friends.

use axum::http::HeaderMap;
use std::time::{SystemTime, UNIX_EPOCH};

use wire_codec::CollectorPayload;

pub const COLLECTOR_NAME: &str = concat!("datenstrom-", env!("CARGO_PKG_VERSION"));
pub const ANONYMOUS_USER_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Reverse-proxy/server internals, never tracker-supplied data. Stripped
/// from recorded `headers` regardless of anonymity.
const HEADER_FILTER: &[&str] = &["remote-address", "raw-request-uri", "timeout-access"];
/// Additionally stripped when the request is anonymous.
const ANONYMOUS_HEADER_FILTER: &[&str] = &["cookie", "x-forwarded-for", "x-real-ip"];

pub fn is_anonymous(headers: &HeaderMap) -> bool {
    headers.get("sp-anonymous").is_some() || headers.get("anonymous").is_some()
}

pub fn recorded_headers(headers: &HeaderMap, anonymous: bool) -> Vec<String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let lower = name.as_str().to_ascii_lowercase();
            if HEADER_FILTER.contains(&lower.as_str()) {
                return None;
            }
            if anonymous && ANONYMOUS_HEADER_FILTER.contains(&lower.as_str()) {
                return None;
            }
            let value = value.to_str().ok()?;
            Some(format!("{}: {}", name.as_str(), value))
        })
        .collect()
}

pub fn network_user_id(anonymous: bool, nuid_param: Option<&str>, cookie_user_id: Option<&str>) -> String {
    if anonymous {
        return ANONYMOUS_USER_ID.to_string();
    }
    if let Some(nuid) = nuid_param {
        return nuid.to_string();
    }
    if let Some(cookie) = cookie_user_id {
        return cookie.to_string();
    }
    uuid::Uuid::new_v4().to_string()
}

fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the Unix epoch")
        .as_millis() as i64
}

/// `query` is the request's raw query string (no leading `?`); `body` is the
/// request body, if the route reads one; `cookie_user_id` is the existing
/// tracking cookie's value, if any.
#[allow(clippy::too_many_arguments)]
pub fn build_collector_payload(
    headers: &HeaderMap,
    peer_ip: String,
    hostname: Option<String>,
    path: String,
    query: Option<String>,
    body: Option<Vec<u8>>,
    anonymous: bool,
    nuid_param: Option<&str>,
    cookie_user_id: Option<&str>,
) -> CollectorPayload {
    let nuid = network_user_id(anonymous, nuid_param, cookie_user_id);
    CollectorPayload {
        schema: wire_codec::payload::THRIFT_SCHEMA.to_string(),
        ip_address: peer_ip,
        timestamp: epoch_millis(),
        encoding: "UTF-8".to_string(),
        collector: COLLECTOR_NAME.to_string(),
        user_agent: headers.get("user-agent").and_then(|v| v.to_str().ok()).map(str::to_string),
        referer_uri: headers.get("referer").and_then(|v| v.to_str().ok()).map(str::to_string),
        path: Some(path),
        querystring: query,
        body,
        headers: Some(recorded_headers(headers, anonymous)),
        content_type: headers.get("content-type").and_then(|v| v.to_str().ok()).map(str::to_string),
        hostname,
        network_user_id: Some(nuid),
    }
}

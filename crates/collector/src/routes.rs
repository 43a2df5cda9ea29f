//! Route handlers, ported from `collector/routes.py` / `collector/app.py`.
//! Vendor paths are served by a single `/:vendor/...` wildcard rather than
//! `add_vendor_path`'s per-configured-vendor route registration — the
//! source's own generic `/{vendor}/tp2` handler already matches any vendor,
//! so the per-vendor registration in `app.py` is redundant with it.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::payload::{build_collector_payload, is_anonymous};
use crate::state::{wire_format, AppState};
use transport::Sink;

pub(crate) const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00,
    0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02,
    0x02, 0x44, 0x01, 0x00, 0x3b,
];

fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let raw = headers.get("cookie")?.to_str().ok()?;
    raw.split(';').find_map(|kv| {
        let (k, v) = kv.trim().split_once('=')?;
        (k == name).then_some(v)
    })
}

async fn write_to_sink(state: &AppState, payload: wire_codec::CollectorPayload) {
    let format = wire_format(&state.config);
    match payload.split_and_serialize(format, state.config.max_bytes) {
        Ok(frames) => match state.sink.write(frames).await {
            Ok(size) => tracing::info!(bytes = size, "wrote to raw sink"),
            Err(e) => tracing::error!(error = %e, "failed to write to raw sink"),
        },
        Err(e) => tracing::warn!(error = %e, "failed to serialize collector payload"),
    }
}

fn set_cookie_response(
    mut response: Response,
    state: &AppState,
    headers: &HeaderMap,
    anonymous: bool,
    user_id: Option<&str>,
) -> Response {
    if let Some(cookie) = crate::cookie::set_cookie_header(&state.config, headers, anonymous, user_id) {
        if let Ok(value) = axum::http::HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(axum::http::header::SET_COOKIE, value);
        }
    }
    response
}

pub async fn root() -> impl IntoResponse {
    "\u{1F44B} Hello, I am your friendly neighborhood datenstrom collector"
}

pub async fn health(axum::extract::Host(host): axum::extract::Host) -> impl IntoResponse {
    Json(serde_json::json!({ "i am": "ok", "hostname": host }))
}

pub async fn check_domain(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    let Some(regex) = &state.config.domain_check_regex else {
        return (StatusCode::BAD_REQUEST, "no domain_check_regex config").into_response();
    };
    if regex == "*" {
        return (StatusCode::OK, "ok").into_response();
    }
    let Some(domain) = params.get("domain") else {
        return (StatusCode::BAD_REQUEST, "no domain query param").into_response();
    };
    match regex::Regex::new(regex) {
        Ok(re) if re.is_match(domain) => (StatusCode::OK, "ok").into_response(),
        Ok(_) => (StatusCode::BAD_REQUEST, "domain does not match domain_check_regex").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, regex, "invalid domain_check_regex configured");
            (StatusCode::BAD_REQUEST, "invalid domain_check_regex configured").into_response()
        }
    }
}

async fn record_and_respond(
    state: AppState,
    headers: HeaderMap,
    connect_info: SocketAddr,
    host: Option<String>,
    path: String,
    uri: Uri,
    body: Option<Vec<u8>>,
    pixel: bool,
) -> Response {
    let anonymous = is_anonymous(&headers);
    let params: HashMap<String, String> =
        uri.query().map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect()).unwrap_or_default();
    let cookie_user_id = get_cookie(&headers, &state.config.cookie_name);

    let payload = build_collector_payload(
        &headers,
        connect_info.ip().to_string(),
        host,
        path,
        uri.query().map(str::to_string),
        body,
        anonymous,
        params.get("nuid").map(String::as_str),
        cookie_user_id,
    );
    let user_id = payload.network_user_id.clone();
    write_to_sink(&state, payload).await;

    let response = if pixel {
        ([(axum::http::header::CONTENT_TYPE, "image/gif")], PIXEL_GIF).into_response()
    } else {
        StatusCode::OK.into_response()
    };
    set_cookie_response(response, &state, &headers, anonymous, user_id.as_deref())
}

pub async fn post_tp2(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    axum::extract::Host(host): axum::extract::Host,
    uri: Uri,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    record_and_respond(state, headers, addr, Some(host), uri.path().to_string(), uri, Some(body.to_vec()), false).await
}

pub async fn vendor_post_tp2(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    axum::extract::Host(host): axum::extract::Host,
    Path(_vendor): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    record_and_respond(state, headers, addr, Some(host), uri.path().to_string(), uri, Some(body.to_vec()), false).await
}

pub async fn vendor_pixel(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    axum::extract::Host(host): axum::extract::Host,
    Path(_vendor): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record_and_respond(state, headers, addr, Some(host), uri.path().to_string(), uri, None, true).await
}

pub async fn vendor_redirect(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    axum::extract::Host(host): axum::extract::Host,
    Path(_vendor): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if !state.config.enable_redirect_tracking {
        return StatusCode::NOT_FOUND.into_response();
    }
    let params: HashMap<String, String> =
        uri.query().map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect()).unwrap_or_default();
    let Some(target) = params.get("u") else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Ok(parsed) = url::Url::parse(target) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if parsed.scheme().is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let anonymous = is_anonymous(&headers);
    let cookie_user_id = get_cookie(&headers, &state.config.cookie_name);
    let payload = build_collector_payload(
        &headers,
        addr.ip().to_string(),
        Some(host),
        uri.path().to_string(),
        uri.query().map(str::to_string),
        None,
        anonymous,
        params.get("nuid").map(String::as_str),
        cookie_user_id,
    );
    let user_id = payload.network_user_id.clone();
    write_to_sink(&state, payload).await;

    let mut response = Response::builder()
        .status(StatusCode::FOUND)
        .header(axum::http::header::LOCATION, parsed.as_str())
        .body(axum::body::Body::empty())
        .expect("static redirect response always builds");
    response = set_cookie_response(response, &state, &headers, anonymous, user_id.as_deref());
    response
}

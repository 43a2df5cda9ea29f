//! Tracking-cookie assignment, ported from `collector/routes.py`'s
//! `make_response`: set only when a network user id is known and the
//! request isn't anonymous; domain chosen by matching the `Origin` header's
//! host against configured `cookie_domains` suffixes, falling back to
//! `cookie_fallback_domain`.

use axum::http::HeaderMap;
use config::Config;
use time::macros::format_description;

const HTTP_DATE: &[time::format_description::FormatItem] =
    format_description!("[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT");

fn origin_host(headers: &HeaderMap) -> Option<String> {
    let origin = headers.get("origin")?.to_str().ok()?;
    url::Url::parse(origin).ok()?.host_str().map(str::to_string)
}

fn cookie_domain(config: &Config, headers: &HeaderMap) -> Option<String> {
    let host = origin_host(headers);
    if let Some(host) = &host {
        if let Some(domain) = config.cookie_domains.iter().find(|d| host.ends_with(d.as_str())) {
            return Some(domain.clone());
        }
    }
    config.cookie_fallback_domain.clone()
}

/// Builds the `Set-Cookie` header value, or `None` if no cookie should be
/// set (anonymous request, cookies disabled, or no user id to carry).
pub fn set_cookie_header(config: &Config, headers: &HeaderMap, anonymous: bool, user_id: Option<&str>) -> Option<String> {
    if anonymous || !config.enable_cookies {
        return None;
    }
    let user_id = user_id?;

    let expires = time::OffsetDateTime::now_utc() + time::Duration::days(config.cookie_expiration_days);
    let mut cookie = format!(
        "{}={}; Expires={}",
        config.cookie_name,
        user_id,
        expires.format(HTTP_DATE).expect("static format description")
    );
    if let Some(domain) = cookie_domain(config, headers) {
        cookie.push_str(&format!("; Domain={domain}"));
    }
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    if config.cookie_http_only {
        cookie.push_str("; HttpOnly");
    }
    cookie.push_str(&format!("; SameSite={}", config.cookie_same_site));
    Some(cookie)
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{self, Request, StatusCode};
use axum::Router;
use config::Config;
use tower::ServiceExt;

use crate::router;
use crate::routes::PIXEL_GIF;
use crate::sink::RawSink;
use crate::state::AppState;
use transport::CountingSink;
use transport::DevSink;

fn test_state(config: Config) -> AppState {
    AppState { config: Arc::new(config), sink: Arc::new(RawSink::Dev(CountingSink::new(DevSink::new()))) }
}

fn app(config: Config) -> Router {
    router(test_state(config))
}

#[tokio::test]
async fn root_says_hello() {
    let resp =
        app(Config::default()).oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_reports_ok() {
    let resp = app(Config::default())
        .oneshot(Request::builder().uri("/health").header(http::header::HOST, "collector.example.com").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn check_domain_without_config_is_rejected() {
    let resp = app(Config::default())
        .oneshot(Request::builder().uri("/check_domain?domain=example.com").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn check_domain_matches_configured_regex() {
    let mut config = Config::default();
    config.domain_check_regex = Some(r"^[a-z]+\.example\.com$".to_string());

    let matching = app(config.clone())
        .oneshot(Request::builder().uri("/check_domain?domain=shop.example.com").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(matching.status(), StatusCode::OK);

    let non_matching = app(config)
        .oneshot(Request::builder().uri("/check_domain?domain=shop.other.com").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(non_matching.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn vendor_pixel_returns_gif() {
    let resp = app(Config::default())
        .oneshot(
            Request::builder()
                .uri("/com.snowplowanalytics.snowplow/i?e=pv")
                .header(http::header::HOST, "collector.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(http::header::CONTENT_TYPE).unwrap(), "image/gif");
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.as_ref(), PIXEL_GIF);
}

#[tokio::test]
async fn post_tp2_accepts_payload_data() {
    let body = r#"{"schema":"iglu:com.snowplowanalytics.snowplow/payload_data/jsonschema/1-0-4","data":[{"e":"pv"}]}"#;
    let resp = app(Config::default())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/com.snowplowanalytics.snowplow/tp2")
                .header(http::header::HOST, "collector.example.com")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn redirect_is_not_found_unless_enabled() {
    let resp = app(Config::default())
        .oneshot(
            Request::builder()
                .uri("/com.snowplowanalytics.snowplow/r?u=https://example.com/")
                .header(http::header::HOST, "collector.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn redirect_follows_target_url_when_enabled() {
    let mut config = Config::default();
    config.enable_redirect_tracking = true;

    let resp = app(config)
        .oneshot(
            Request::builder()
                .uri("/com.snowplowanalytics.snowplow/r?u=https://example.com/landing")
                .header(http::header::HOST, "collector.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers().get(http::header::LOCATION).unwrap(), "https://example.com/landing");
}

#[tokio::test]
async fn anonymous_request_gets_no_cookie() {
    let mut config = Config::default();
    config.enable_cookies = true;

    let resp = app(config)
        .oneshot(
            Request::builder()
                .uri("/com.snowplowanalytics.snowplow/i")
                .header(http::header::HOST, "collector.example.com")
                .header("sp-anonymous", "*")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(http::header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn non_anonymous_request_gets_a_cookie_when_enabled() {
    let mut config = Config::default();
    config.enable_cookies = true;

    let resp = app(config)
        .oneshot(
            Request::builder()
                .uri("/com.snowplowanalytics.snowplow/i")
                .header(http::header::HOST, "collector.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(http::header::SET_COOKIE).is_some());
}

#[tokio::test]
async fn anonymous_request_strips_cookie_and_ip_headers() {
    let sink = Arc::new(RawSink::Dev(CountingSink::new(DevSink::new())));
    let state = AppState { config: Arc::new(Config::default()), sink: sink.clone() };

    let resp = router(state)
        .oneshot(
            Request::builder()
                .uri("/com.snowplowanalytics.snowplow/i")
                .header(http::header::HOST, "collector.example.com")
                .header("sp-anonymous", "*")
                .header("cookie", "sp=some-id")
                .header("x-forwarded-for", "203.0.113.5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let RawSink::Dev(dev) = sink.as_ref() else { unreachable!() };
    let record = dev.inner().last_record().expect("request recorded to dev sink");
    let payload = wire_codec::CollectorPayload::decode(&record, wire_codec::Format::Thrift).unwrap();
    let headers = payload.headers.unwrap_or_default().join("\n").to_ascii_lowercase();
    assert!(!headers.contains("cookie"));
    assert!(!headers.contains("x-forwarded-for"));
    assert_eq!(payload.network_user_id.as_deref(), Some(crate::payload::ANONYMOUS_USER_ID));
}

//! The `collector` binary: an HTTP frontend accepting Snowplow-compatible
//! tracker requests and writing them to the raw lane. Ported from
//! `collector/{app.py,routes.py,collect.py}`.

mod cookie;
mod payload;
mod routes;
mod sink;
mod state;
#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use config::{Config, PartialConfig};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Builds the full route table over `state`. Split out from `main` so tests
/// can drive it directly with `tower::ServiceExt::oneshot`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/check_domain", get(routes::check_domain))
        .route("/com.snowplowanalytics.snowplow/tp2", post(routes::post_tp2))
        .route("/:vendor/tp2", post(routes::vendor_post_tp2))
        .route("/:vendor/i", get(routes::vendor_pixel))
        .route("/:vendor/v1", get(routes::vendor_pixel))
        .route("/:vendor/r", get(routes::vendor_redirect))
        .route("/:vendor/r/tp2", get(routes::vendor_redirect))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Mirrors `app.py`'s `cors_preflight` middleware: echo back whatever
/// `Origin` the tracker sent, allow credentials, and cache preflight
/// responses for an hour.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("sp-anonymous"),
            HeaderName::from_static("anonymous"),
            header::ORIGIN,
            header::REFERER,
            header::USER_AGENT,
        ])
        .max_age(std::time::Duration::from_secs(3600))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load(PartialConfig::default())?;
    telemetry::init(telemetry::stderr_log_handler);

    let raw_sink = sink::raw_sink(&config).await?;
    let addr: SocketAddr = config.collector_listen_addr.parse()?;
    let state = AppState { config: Arc::new(config), sink: Arc::new(raw_sink) };
    let app = router(state);

    tracing::info!(%addr, "collector listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

// Library exports for the binaries and integration tests
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{delete, get, patch},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::DocumentStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<Config>,
}

/// Preflight policy for the single allowed browser origin.
pub fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin)
        .map_err(|e| anyhow::anyhow!("Invalid CORS_ORIGIN `{}`: {}", origin, e))?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_headers(AllowHeaders::list([
            header::CACHE_CONTROL,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-count"),
            header::USER_AGENT,
        ]))
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ]))
}

pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let router = Router::new()
        .route("/", get(routes::root::hello))
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Shipping windows
        .route(
            "/shipping",
            get(routes::shipping::list_windows).post(routes::shipping::create_window),
        )
        .route(
            "/shipping/current-notifications",
            get(routes::shipping::current_notifications),
        )
        .route(
            "/shipping/{shipping_date_id}",
            delete(routes::shipping::delete_window),
        )
        .route(
            "/shipping/{shipping_date_id}/edit",
            patch(routes::shipping::update_window),
        )
        // Registered before the layers so preflight also covers unknown paths
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http());

    let router = match &state.config.cors_origin {
        Some(origin) => router.layer(cors_layer(origin)?),
        None => router,
    };

    Ok(router.with_state(state))
}

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

use axum::{
    http::{header, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::middleware::{
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SummarizeConfig;
use crate::services::providers::ChatProvider;
use crate::services::{QuotaStore, TokenVerifier};

/// Shared application state: read-only configuration and collaborators,
/// built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: SummarizeConfig,
    pub verifier: TokenVerifier,
    pub store: Arc<dyn QuotaStore>,
    pub provider: Arc<dyn ChatProvider>,
}

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/me", get(handlers::me::get_me))
        .route("/api/chat", post(handlers::chat::chat))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let cors = cors_layer(&state.config.security.allowed_origins);

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");

            tracing::info_span!(
                "http_request",
                request_id = %request_id,
                method = %request.method(),
                uri = %request.uri(),
            )
        }))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if allowed_origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(
            allowed_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok())
                .collect::<Vec<HeaderValue>>(),
        )
    }
}

/// Liveness probe. Static by design: it confirms the process serves
/// traffic and deliberately touches neither the store nor the provider.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "summarize-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

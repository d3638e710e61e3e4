pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod validation;
pub mod view;

use std::sync::Arc;

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use llm_core::Multiplexer;
use tts_core::SpeechSynthesizer;

use crate::config::ServerConfig;
use crate::metrics::AppMetrics;

#[derive(Clone)]
pub struct AppState {
    pub multiplexer: Multiplexer,
    pub speech: Arc<SpeechSynthesizer>,
    pub metrics: AppMetrics,
    pub config: ServerConfig,
}

/// Every route, served at the root and under `/api`.
pub fn build_router(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/health", get(routes::health_check))
        .route("/healthz", get(routes::health_check))
        .route("/categories", get(routes::list_categories))
        .route("/rhythms", get(routes::list_rhythms))
        .route("/archetypes", get(routes::list_archetypes))
        .route("/style", get(routes::get_style).put(routes::put_style))
        .route("/sessions", get(routes::list_sessions))
        .route("/sessions/{category}", get(routes::get_session))
        .route("/sessions/{category}/generate", post(routes::generate))
        .route("/sessions/{category}/random", post(routes::generate_random))
        .route("/sessions/{category}/word", post(routes::generate_from_word))
        .route(
            "/sessions/{category}/variants/{variant}/speech",
            post(routes::variant_speech),
        )
        .route("/sessions/{category}/ws", get(routes::session_ws))
        .route("/speech", post(routes::speech));

    // Metrics endpoint - consider adding authentication in production
    let metrics_api = Router::new().route("/metrics", get(routes::metrics_endpoint));

    let api = Router::new().merge(public_api).merge(metrics_api);

    Router::new()
        .merge(api.clone()) // root paths
        .nest("/api", api) // /api prefix
        .layer(axum::middleware::from_fn(add_request_id))
        .with_state(state)
}

/// Tags request and response with a fresh `x-request-id`.
pub async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let Ok(value) = HeaderValue::from_str(&request_id) else {
        return next.run(request).await;
    };
    request.headers_mut().insert("x-request-id", value.clone());
    let mut response = next.run(request).await;
    response.headers_mut().insert("x-request-id", value);
    response
}

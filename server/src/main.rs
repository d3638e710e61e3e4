use std::{net::SocketAddr, sync::Arc};

use axum::http::Method;
use llm_core::{shared_client, GeminiConfig, GenerationClient, Multiplexer};
use lyrics_core::catalog::DEFAULT_CATEGORY;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer};
use tracing::{info, warn};
use tts_core::SpeechSynthesizer;

use server::config::ServerConfig;
use server::metrics::AppMetrics;
use server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting lyric generation server...");

    let config = ServerConfig::from_env();
    let gemini = shared_client(&GeminiConfig::from_env())?;

    let multiplexer = Multiplexer::new(GenerationClient::new(gemini.clone()), config.supersede_policy);
    let speech = Arc::new(SpeechSynthesizer::new(gemini));

    let state = AppState {
        multiplexer: multiplexer.clone(),
        speech,
        metrics: AppMetrics::new(),
        config: config.clone(),
    };
    info!(
        "Server configuration loaded: port={}, rate_limit={}/min, supersede_policy={:?}",
        config.port, config.rate_limit_per_minute, config.supersede_policy
    );

    let methods = [Method::GET, Method::POST, Method::PUT, Method::OPTIONS];
    let cors = match config.cors_allowed_origins.as_deref() {
        Some(allowed_origins) => {
            let origins: Vec<axum::http::HeaderValue> = allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            if origins.is_empty() {
                warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
                CorsLayer::new().allow_origin(tower_http::cors::Any)
            } else {
                info!("CORS configured for {} origin(s)", origins.len());
                CorsLayer::new().allow_origin(tower_http::cors::AllowOrigin::list(origins))
            }
        }
        None => {
            warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
            CorsLayer::new().allow_origin(tower_http::cors::Any)
        }
    }
    .allow_methods(methods)
    .allow_headers(tower_http::cors::Any)
    .allow_credentials(false);

    // Global key: every client shares one budget, which also works behind proxies.
    // The governor takes the interval between replenished slots, not a rate.
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(config.replenish_interval_ms())
            .burst_size(config.rate_limit_per_minute)
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
    );
    info!("Rate limiting: {} requests per minute", config.rate_limit_per_minute);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors)
        .into_inner();

    let app = build_router(state).layer(middleware_stack);

    if config.generate_on_startup {
        match multiplexer.rerun(DEFAULT_CATEGORY) {
            Ok(ticket) => info!("Startup generation for {} (epoch {})", ticket.category, ticket.epoch.0),
            Err(e) => warn!("Startup generation skipped: {e}"),
        }
    }

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

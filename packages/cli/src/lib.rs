// ABOUTME: Server bootstrap for prdsmith
// ABOUTME: Wires the LLM client, database pool and workflow into the HTTP router with CORS and tracing

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::Router;
use prdsmith_ai::{AiSettings, ChatService};
use prdsmith_api::{create_router, AppState};
use prdsmith_prd::PrdWorkflow;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod config;

use config::Config;

/// Apply CORS and request tracing on top of the API router
pub fn build_app(config: &Config, state: AppState) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Ok(create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let settings = AiSettings::from_env();
    info!("Using model {} at {}", settings.model, settings.base_url);
    let client = Arc::new(ChatService::new(settings)?);

    let pool = prdsmith_storage::connect(&config.database_url).await?;
    let workflow =
        PrdWorkflow::new(client, pool).with_diagram_attempts(config.diagram_max_attempts);

    let app = build_app(&config, AppState::new(workflow))?;

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);
    info!("CORS origin: {}", config.cors_origin);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

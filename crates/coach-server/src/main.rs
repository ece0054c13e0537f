mod configuration;
mod error;
mod routes;
mod state;

use anyhow::Result;
use coach::providers::factory;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let settings = configuration::Settings::new()?;
    let system_prompt = settings.relay.system_prompt()?;
    let idle_timeout = settings.relay.idle_timeout();
    let addr = settings.server.socket_addr()?;

    let provider_config = settings.provider.into_config();
    info!(
        model = %provider_config.upstream().model,
        host = %provider_config.upstream().host,
        "using upstream provider"
    );
    let provider = factory::get_provider(provider_config)?;

    let shutdown = CancellationToken::new();
    let state = state::AppState::new(provider, system_prompt, idle_timeout, shutdown.clone());

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;
    Ok(())
}

/// Wait for Ctrl-C, then cancel every in-flight relay so open bodies terminate.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
    shutdown.cancel();
}

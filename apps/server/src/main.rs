//! ContextFunnel HTTP server — the processing pipeline behind a JSON API.

mod routes;

use std::sync::Arc;

use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use contextfunnel_core::Pipeline;
use contextfunnel_shared::load_config;

use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    let pipeline = Pipeline::from_config(&config).await?;
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}

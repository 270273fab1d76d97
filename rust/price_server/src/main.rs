use anyhow::Result;
use common::ServerConfig;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod handlers;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_new(&config.log_filter)?)
        .init();

    info!("======================================================================");
    info!("Property Price Server - Starting");
    info!("======================================================================");

    // A missing or broken bundle is not fatal; /predict reports it per request.
    let state = Arc::new(AppState::bootstrap(&config.model_path));

    let app = handlers::router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server ready on http://{}", addr);
    info!("======================================================================");

    axum::serve(listener, app).await?;

    Ok(())
}

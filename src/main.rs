mod backend;
mod config;
mod guard;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use backend::{BackendClient, BackendError};
use config::{AppConfig, ConfigError};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("server i/o: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "logistics-pro failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env()?;
    let client = BackendClient::new(&config)?;
    tracing::info!(backend = %config.backend_url, "hosted backend client initialized");

    let state = state::AppState::from_backend(Arc::new(client), config.cookie_secure);
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "logistics-pro listening");
    axum::serve(listener, app).await?;
    Ok(())
}

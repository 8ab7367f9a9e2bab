mod config;
mod gemini;
mod i18n;
mod models;
mod prompts;
mod render;
mod routes;
mod session;
mod settings;

use anyhow::Context;
use routes::{router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::gemini::{FloralModel, GeminiClient};
use crate::session::Session;
use crate::settings::SettingsStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    tracing::info!(
        settings = %config.settings_path.display(),
        analysis_model = %config.analysis_model,
        image_model = %config.image_model,
        "Loaded configuration"
    );

    let settings = Arc::new(SettingsStore::load(&config.settings_path, config.api_key.clone()));
    if !settings.public().has_api_key {
        tracing::warn!("No Gemini API key configured yet; set one via PUT /api/settings");
    }

    let gemini: Arc<dyn FloralModel> = Arc::new(GeminiClient::from_config(&config));
    let state = AppState {
        session: Arc::new(Session::new(gemini, settings)),
    };

    let app = router(state, config.max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "Starting server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

use std::net::SocketAddr;

use anyhow::Context;
use dealership_api_rust::{
    build_router,
    config::Config,
    constants::API_NAME,
    images::{build_image_store, ImagePolicy},
    repository::Storage,
    state::AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "{} Starting dealership API on port {} (storage: {:?}, images: {:?})",
        API_NAME,
        config.server_port,
        config.storage_backend,
        config.image_storage
    );

    let storage = Storage::open(&config)
        .await
        .context("Failed to open storage")?;

    if config.admin_token.is_none() {
        tracing::warn!("{} ADMIN_TOKEN is not set; admin routes are unprotected", API_NAME);
    }

    let state = AppState::new(
        storage.clone(),
        build_image_store(&config),
        ImagePolicy::from_config(&config),
        config.admin_token.clone(),
    );
    let app = build_router(state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("{} Server listening on {}", API_NAME, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    storage.close().await;
    tracing::info!("{} Server stopped", API_NAME);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("{} Failed to listen for Ctrl-C: {}", API_NAME, e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("{} Failed to listen for SIGTERM: {}", API_NAME, e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("{} Shutdown signal received", API_NAME);
}

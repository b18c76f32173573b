//! eSim Cloud state save server.
//!
//! Main entry point that wires the crates together and starts the server.

use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use esim_core::config::AppConfig;
use esim_core::error::AppError;
use esim_database::Repositories;

#[tokio::main]
async fn main() {
    let env = std::env::var("ESIM_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting eSim state save server v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Thumbnail directory ──────────────────────────────
    tokio::fs::create_dir_all(&config.storage.thumbnail_dir)
        .await
        .map_err(|e| {
            AppError::storage(format!(
                "Failed to create dir '{}': {}",
                config.storage.thumbnail_dir, e
            ))
        })?;

    // ── Step 2: Store + migrations ───────────────────────────────
    tracing::info!(provider = ?config.database.provider, "Initializing store...");
    let (repos, db_pool) = Repositories::from_config(&config.database).await?;

    // ── Step 3: Build and start HTTP server ──────────────────────
    let addr = config.server.bind_address();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let app_state = esim_api::AppState::new(config, repos, db_pool.clone());
    let app = esim_api::build_app(app_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("eSim server listening on {}", addr);

    // ── Step 4: Graceful shutdown ────────────────────────────────
    let (notify_tx, notify_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                tracing::info!("Shutdown signal received, starting graceful shutdown...");
                let _ = notify_tx.send(());
            })
            .await
    });

    let _ = notify_rx.await;
    match tokio::time::timeout(grace, server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => return Err(AppError::internal(format!("Server error: {e}"))),
        Ok(Err(e)) => return Err(AppError::internal(format!("Server task failed: {e}"))),
        Err(_) => tracing::warn!("Graceful shutdown timed out; dropping open connections"),
    }

    if let Some(pool) = db_pool {
        pool.close().await;
    }

    tracing::info!("eSim server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}

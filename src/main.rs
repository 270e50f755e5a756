//! Upload Portal Server
//!
//! Login-gated file uploads backed by SQLite and a local directory.

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use upload_portal::config::Config;
use upload_portal::routes;
use upload_portal::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "upload_portal=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // A bad value aborts startup instead of reverting to defaults, which
    // would re-enable the default account
    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!("Starting Upload Portal v{}", env!("CARGO_PKG_VERSION"));

    let addr = config.bind_addr();
    let app_state = AppState::bootstrap(config)
        .await
        .context("Failed to initialize application state")?;

    let app = routes::app(app_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Upload Portal listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

//! HTTP and WebSocket API server.
//!
//! Exposes the services over a JSON API under `/api`, a realtime channel at
//! `/ws`, and the stored images under `/uploads`.

pub mod error;
mod handlers;
mod routes;

pub use error::{AppError, AppResult};
pub use routes::create_router;

use std::net::SocketAddr;
use std::time::Duration;

use crate::config::Settings;
use crate::services::ServiceContext;

/// Interval between expired-session purges and hub cleanups.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub ctx: ServiceContext,
}

impl AppState {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }
}

fn spawn_maintenance(ctx: ServiceContext) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = ctx.auth().purge_expired().await {
                tracing::warn!("Session purge failed: {}", e);
            }
            let pruned = ctx.hub.prune();
            if pruned > 0 {
                tracing::debug!("Pruned {} idle rooms", pruned);
            }
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
    tracing::info!("Shutdown signal received");
}

/// Start the web server and run until Ctrl+C or SIGTERM.
pub async fn serve(settings: Settings, addr: SocketAddr) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let ctx = ServiceContext::new(settings);
    ctx.db.init_schema().await?;

    let maintenance = spawn_maintenance(ctx.clone());
    let app = create_router(AppState::new(ctx));

    tracing::info!("Starting server at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    maintenance.abort();
    tracing::info!("Server stopped");
    Ok(())
}

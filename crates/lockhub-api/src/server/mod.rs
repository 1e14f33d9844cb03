//! Web server for the LockHub backend.

pub mod middleware;
pub mod router;
pub mod types;

// Re-export commonly used types
pub use router::create_router_with_state;
pub use types::{MAX_REQUEST_BODY_SIZE, ServerState};

use std::net::SocketAddr;
use std::time::Duration;

use lockhub_core::config::{cache, rate_limits};

/// Start the web server on a specific address.
/// This is the main entry point for running the server.
pub async fn run(bind: SocketAddr, state: ServerState) -> anyhow::Result<()> {
    // Rate limit cleanup: evict identities whose window fully elapsed.
    let limiter = state.rate_limiter.clone();
    tokio::spawn(crate::rate_limit::cleanup_task(
        limiter,
        Duration::from_secs(rate_limits::WINDOW_SECS),
        Duration::from_secs(rate_limits::CLEANUP_INTERVAL_SECS),
    ));

    // Status cache cleanup.
    let status_cache = state.status_cache.clone();
    tokio::spawn(lockhub_devices::status_cache::cleanup_task(
        status_cache,
        Duration::from_secs(cache::CLEANUP_INTERVAL_SECS),
    ));

    let app = create_router_with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(bind = %bind, "server listening");

    // ConnectInfo feeds the rate limiter's per-IP fallback identity.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

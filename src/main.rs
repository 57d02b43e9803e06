//! Ring Cache - clustered in-memory cache node
//!
//! Serves the public `/cache` API and the peer `/rpc` API for the keys this
//! node owns on the hash ring, forwarding everything else to its owner.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ring_cache::api::create_router;
use ring_cache::clock::SystemClock;
use ring_cache::cluster::HttpForwarder;
use ring_cache::{AppState, Config};

/// Time the maintenance loop gets to finish its iteration on shutdown.
const MAINTENANCE_GRACE: Duration = Duration::from_secs(5);

/// Main entry point for a cache node.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the ring, start the engine worker and the forwarding client
/// 4. Start the maintenance loop on its own runtime
/// 5. Serve HTTP until SIGINT/SIGTERM
/// 6. Stop the maintenance loop, aborting it after a grace period
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ring_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Ring Cache node");

    let config = Config::from_env();
    info!(
        node_id = %config.node_id,
        virtual_nodes = config.virtual_nodes,
        members = config.cluster_nodes.len(),
        max_cache_size = config.max_cache_size,
        headroom = config.headroom,
        eviction_policy = %config.eviction_policy,
        cleaner_threads = config.cleaner_threads,
        request_timeout_ms = config.request_timeout_ms,
        port = config.server_port,
        "Configuration loaded"
    );

    let forwarder = HttpForwarder::new(Duration::from_millis(config.request_timeout_ms))
        .context("failed to create forwarding client")?;
    let (state, maintenance) =
        AppState::from_config(&config, Arc::new(forwarder), Arc::new(SystemClock));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let maintenance_runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.cleaner_threads.max(1))
        .thread_name("cache-cleaner")
        .enable_all()
        .build()
        .context("failed to build maintenance runtime")?;
    let maintenance = maintenance.spawn(maintenance_runtime.handle());
    info!("Maintenance loop scheduled");

    let app = create_router(state);
    info!("Server listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if !maintenance.stop(MAINTENANCE_GRACE).await {
        warn!("Maintenance loop was force-stopped");
    }
    maintenance_runtime.shutdown_background();

    served.context("server error")?;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

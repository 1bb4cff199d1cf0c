//! product_ledger - Event-sourced product store
//!
//! Serves the product API over HTTP. All state is held in memory for the
//! lifetime of the process.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use product_ledger::api;
use product_ledger::domain::CancellationSignal;
use product_ledger::jobs::JobScheduler;
use product_ledger::locks::LockManager;
use product_ledger::publisher::EventPublisher;
use product_ledger::{Config, ProductService};

/// Initialize tracing/logging
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "product_ledger=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration
    let config = Config::from_env()?;
    let addr: SocketAddr = config.bind_addr().parse()?;

    tracing::info!(
        environment = %config.environment,
        lock_ttl_ms = config.lock_ttl.as_millis() as u64,
        batch_concurrency = config.batch_concurrency,
        "Starting product_ledger server"
    );

    let locks = Arc::new(LockManager::new());
    let service = ProductService::new(config.service_settings())
        .with_lock_manager(Arc::clone(&locks))
        .with_publisher(EventPublisher::new(config.publisher_capacity));

    // Background lock sweep
    let scheduler =
        JobScheduler::with_config(locks, config.scheduler_config()).start(CancellationSignal::new());

    let app = api::build_app(service);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    scheduler.shutdown().await;
    tracing::info!("Background jobs stopped. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

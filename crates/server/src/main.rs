use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use batchgen_core::{
    create_generator, load_config, validate_config, BatchOrchestrator, CampaignStore,
    SqliteCampaignStore,
};
use batchgen_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("batchgen {}", VERSION);

    // Determine config path
    let config_path = std::env::var("BATCHGEN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Generator backend: {}", config.generator.backend.as_str());

    // Create SQLite campaign store
    let store: Arc<dyn CampaignStore> = Arc::new(
        SqliteCampaignStore::new(&config.database.path)
            .context("Failed to create campaign store")?,
    );
    info!("Campaign store initialized");

    // Create orchestrator if a generator is configured
    let generator =
        create_generator(&config.generator).context("Failed to create step generator")?;
    let orchestrator = match generator {
        Some(generator) => {
            info!("Initializing batch orchestrator with {} generator", generator.name());
            let orch = BatchOrchestrator::new(
                config.orchestrator.clone(),
                Arc::clone(&store),
                generator,
            );

            match orch.recover_interrupted() {
                Ok(resumed) if !resumed.is_empty() => {
                    info!("Resumed {} interrupted campaigns", resumed.len())
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to recover interrupted campaigns: {}", e),
            }

            Some(orch)
        }
        None => {
            info!("Generator disabled, batch generation endpoints will return 503");
            None
        }
    };

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), store, orchestrator));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // In-flight runs are abandoned here; the next start resumes them.
    info!("Server shutting down...");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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

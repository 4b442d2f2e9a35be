use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spooty_core::downloader::{AudioFetcher, Cookies, YtDlpFetcher};
use spooty_core::searcher::{TrackSearcher, YtDlpSearcher};
use spooty_core::tagger::{CoverTagger, LoftyTagger};
use spooty_core::track::SqliteTrackStore;
use spooty_core::{
    load_config, validate_config, EventBus, OrchestratorConfig, TrackOrchestrator, TrackStore,
};

use spooty_server::api::create_router;
use spooty_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
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

    // Determine config path
    let config_path = std::env::var("SPOOTY_CONFIG")
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
    info!("Downloads root: {:?}", config.downloads.root);

    // Create SQLite track store
    let store: Arc<dyn TrackStore> = Arc::new(
        SqliteTrackStore::new(&config.database.path).context("Failed to create track store")?,
    );
    info!("Track store initialized");

    // Resolve yt-dlp cookies (inline content or file path)
    let cookies = Arc::new(Cookies::from_config(
        config.youtube.cookies.clone(),
        config.youtube.cookies_file.clone(),
    ));
    if cookies.is_configured() {
        info!("YouTube cookies configured");
    }

    // Create the pipeline stages
    let searcher: Arc<dyn TrackSearcher> = Arc::new(YtDlpSearcher::new(
        config.youtube.ytdlp_path.clone(),
        Arc::clone(&cookies),
    ));
    let fetcher: Arc<dyn AudioFetcher> = Arc::new(YtDlpFetcher::new(
        config.youtube.ytdlp_path.clone(),
        config.downloads.format.extension().to_string(),
        config.downloads.timeout_ms,
        Arc::clone(&cookies),
    ));
    let tagger: Arc<dyn CoverTagger> = Arc::new(LoftyTagger::new());

    // Create event bus for real-time updates
    let events = EventBus::default();

    // Create and start the orchestrator
    let orchestrator = Arc::new(TrackOrchestrator::new(
        OrchestratorConfig::from(&config),
        store,
        searcher,
        fetcher,
        tagger,
        events,
    ));
    orchestrator.start().await;
    info!("Track orchestrator started");

    // Create app state
    let app_state = Arc::new(AppState::new(config.clone(), Arc::clone(&orchestrator)));

    // Create router
    let app = create_router(app_state);

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

    // Stop orchestrator
    info!("Server shutting down...");
    orchestrator.stop().await;
    info!("Orchestrator stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

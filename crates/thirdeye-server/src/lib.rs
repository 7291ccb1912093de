//! Thirdeye Server
//!
//! HTTP front end for the evidence confidence pipeline. Wires the SQLite
//! store, the web search client, the narrative-synthesis provider, the
//! historical pattern matcher and the misuse guard into one orchestrator
//! and serves it with axum.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use config::ServerConfig;
use handlers::{create_router, AppState};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use thirdeye_domain::traits::HistoricalEventStore;
use thirdeye_gatekeeper::{ForkAuditor, GuardWorker, MisuseGuard};
use thirdeye_llm::AnthropicProvider;
use thirdeye_patterns::PatternMatcher;
use thirdeye_pipeline::Orchestrator;
use thirdeye_search::WebSearchClient;
use thirdeye_store::{SqliteStore, StoreReportSink};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Storage could not be opened or seeded
    #[error("Storage error: {0}")]
    Store(#[from] thirdeye_store::StoreError),

    /// A component refused its configuration
    #[error("Startup error: {0}")]
    Startup(String),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Production application state
pub type ServerState = AppState<WebSearchClient, AnthropicProvider>;

/// Build every component from configuration
///
/// Opens the database, seeds it with the historical corpus and routes
/// abuse reports into the same connection.
pub fn build_state(config: &ServerConfig) -> Result<ServerState, ServerError> {
    let matcher = Arc::new(
        PatternMatcher::new(&config.patterns).map_err(|e| ServerError::Startup(e.to_string()))?,
    );

    let mut store = SqliteStore::new(&config.database_path)?;
    let seeded = store.upsert_events(matcher.events())?;
    info!(
        "Seeded {} historical events (corpus v{})",
        seeded,
        matcher.corpus_version()
    );
    let store = Arc::new(Mutex::new(store));

    let sink = Arc::new(StoreReportSink::new(Arc::clone(&store)));
    let guard = Arc::new(
        MisuseGuard::new(config.guard.clone(), sink).map_err(|e| ServerError::Startup(e.to_string()))?,
    );

    let search = WebSearchClient::new(&config.search).map_err(|e| ServerError::Startup(e.to_string()))?;
    let llm = AnthropicProvider::new(config.llm.clone()).map_err(|e| ServerError::Startup(e.to_string()))?;

    let orchestrator = Orchestrator::new(config.pipeline.clone(), store, search, llm, matcher, guard)
        .map_err(|e| ServerError::Startup(e.to_string()))?;
    let auditor = ForkAuditor::new().map_err(|e| ServerError::Startup(e.to_string()))?;

    Ok(AppState {
        orchestrator: Arc::new(orchestrator),
        auditor: Arc::new(auditor),
        operators: Arc::new(config.operators.iter().map(|o| o.trim().to_string()).collect()),
    })
}

/// Start the HTTP server and run until Ctrl+C
///
/// The guard's sweep worker runs alongside the server and is stopped by
/// clearing the guard once the listener has drained.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    info!("Starting Thirdeye server");
    info!("Database: {}", config.database_path.display());

    let state = build_state(&config)?;
    let guard: Arc<MisuseGuard> = Arc::clone(state.orchestrator.guard());

    let worker = GuardWorker::new(Arc::clone(&guard));
    let worker_handle = tokio::spawn(async move {
        worker.run(std::future::pending::<()>()).await;
    });

    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Thirdeye listening on {}", config.bind_addr());

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| ServerError::Server(e.to_string()));

    if let Err(e) = guard.clear() {
        warn!("Failed to clear guard state: {}", e);
    }
    if let Err(e) = worker_handle.await {
        warn!("Guard worker ended abnormally: {}", e);
    }

    info!("Thirdeye server stopped");
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

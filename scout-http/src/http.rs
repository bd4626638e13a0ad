use axum::{
    routing::{get, post},
    Router,
};
use scout_core::{AgentEngine, RelayConfig, SessionStore};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::apis;
use crate::session::{SessionManager, SessionManagerConfig};

/// Configuration for the HTTP server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Server bind address (e.g., "127.0.0.1:8000")
    pub address: String,
    /// Session manager configuration
    pub session_manager: SessionManagerConfig,
    /// How runs are translated onto the wire
    pub relay: RelayConfig,
}

impl ServerConfig {
    /// Create a new server config with the given address and default settings
    pub fn new(address: String) -> Self {
        Self {
            address,
            session_manager: SessionManagerConfig::default(),
            relay: RelayConfig::default(),
        }
    }

    /// Set the maximum number of threads
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.session_manager.max_threads = max_threads;
        self
    }

    /// Set the overall run timeout (None = unbounded)
    pub fn with_run_timeout(mut self, run_timeout: Option<Duration>) -> Self {
        self.relay.run_timeout = run_timeout;
        self
    }

    /// Set the name of the tool reported as web search
    pub fn with_search_tool(mut self, search_tool: impl Into<String>) -> Self {
        self.relay.search_tool = search_tool.into();
        self
    }
}

/// Server state shared by all handlers
#[derive(Clone)]
pub struct ServerState {
    pub session_manager: Arc<SessionManager>,
    pub engine: Arc<dyn AgentEngine>,
    pub relay: RelayConfig,
}

impl ServerState {
    pub fn new(
        config: &ServerConfig,
        engine: Arc<dyn AgentEngine>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            session_manager: Arc::new(SessionManager::new(store, config.session_manager.clone())),
            engine,
            relay: config.relay.clone(),
        }
    }
}

/// Routes of the chat API
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/chat", post(apis::chat::handle_chat_stream))
        .route("/health", get(apis::chat::handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server with SSE streaming
pub async fn start_server(
    config: ServerConfig,
    engine: Arc<dyn AgentEngine>,
    store: Arc<dyn SessionStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = ServerState::new(&config, engine, store);

    println!("✓ Session manager initialized");
    if let Some(max) = config.session_manager.max_threads {
        println!("  Max threads: \x1b[1m{}\x1b[0m", max);
    } else {
        println!("  Max threads: \x1b[1munlimited\x1b[0m");
    }
    match config.relay.run_timeout {
        Some(timeout) => println!("  Run timeout: \x1b[1m{}s\x1b[0m", timeout.as_secs()),
        None => println!("  Run timeout: \x1b[1mnone\x1b[0m"),
    }
    println!("  Search tool: \x1b[1m{}\x1b[0m", config.relay.search_tool);
    println!();

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&config.address).await?;

    println!("Server starting on \x1b[1mhttp://{}\x1b[0m", config.address);
    println!("\nAvailable endpoints:");
    println!("  \x1b[1mPOST /chat\x1b[0m      - Streaming chat (server-sent events)");
    println!("  \x1b[1mGET  /health\x1b[0m    - Health check");
    println!("\nPress Ctrl+C to stop\n");

    info!("HTTP server listening on {}", config.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

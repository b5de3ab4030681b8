//! HTTP auth backend.
//!
//! Serves signup and login over the same [`Portal`] state the REPL uses,
//! persisted to the configured data directory.

pub mod routes;

use crate::config::Config;
use crate::error::Result;
use crate::portal::Portal;
use crate::store::{DynStore, JsonFileStore};
use anyhow::Context as _;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared state for the backend
pub struct ServerState {
    portal: Mutex<Portal<DynStore>>,
}

impl ServerState {
    pub fn new(portal: Portal<DynStore>) -> Arc<Self> {
        Arc::new(Self {
            portal: Mutex::new(portal),
        })
    }

    /// Run one operation against the portal under the lock.
    ///
    /// Store access is blocking file IO, so the work runs on tokio's
    /// blocking pool rather than on a runtime worker.
    pub async fn with_portal<T, F>(self: &Arc<Self>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Portal<DynStore>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            // Mutations commit only after their writes succeed, so the state
            // behind a poisoned lock is still consistent.
            let mut portal = state.portal.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut portal)
        })
        .await?
    }
}

/// Build the router with CORS open to all origins
pub fn app(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", routes::routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the backend until Ctrl+C or SIGTERM
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let data_dir = config.resolve_data_dir();
    let store: DynStore = Box::new(JsonFileStore::open(&data_dir)?);
    let portal = Portal::load(store, &config.admin)?;
    info!(data_dir = %data_dir.display(), users = portal.users().len(), "state loaded");

    let app = app(ServerState::new(portal));

    let address = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {}", address))?;
    info!("Auth backend listening on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Auth backend stopped");
    Ok(())
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let users = state
        .with_portal(|p| {
            p.reload()?;
            Ok(p.users().len())
        })
        .await
        .unwrap_or(0);
    Json(json!({
        "status": "ok",
        "users": users,
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
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

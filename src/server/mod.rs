// src/server/mod.rs

//! HTTP run-control surface.
//!
//! | Method | Path | |
//! |---|---|---|
//! | POST | `/api/scripts/install` | start an install run |
//! | POST | `/api/scripts/update` | start an update run |
//! | GET | `/api/scripts` | list runs |
//! | GET | `/api/scripts/{id}` | run snapshot |
//! | POST | `/api/scripts/{id}/cancel` | request termination |
//! | GET | `/api/scripts/stream/{id}?cursor=N` | SSE attach-to-stream |

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

use crate::broadcast::Broadcaster;
use crate::config::ConfigFile;
use crate::errors::{Result, RuncastError};
use crate::exec::ProcessRunner;
use crate::registry::ProcessRegistry;

pub mod error;
pub mod routes;
pub mod scripts;

pub use error::ApiError;
pub use scripts::{InstallRequest, ScriptCommand, UpdateRequest};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: ProcessRegistry,
    pub broadcaster: Broadcaster,
    pub scripts: Arc<ScriptCommand>,
}

impl AppState {
    pub fn new(registry: ProcessRegistry, scripts: ScriptCommand) -> Self {
        let broadcaster = Broadcaster::new(registry.clone());
        Self {
            registry,
            broadcaster,
            scripts: Arc::new(scripts),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/scripts", get(routes::list_runs))
        .route("/api/scripts/install", post(routes::start_install))
        .route("/api/scripts/update", post(routes::start_update))
        .route("/api/scripts/stream/{id}", get(routes::stream_run))
        .route("/api/scripts/{id}", get(routes::get_run))
        .route("/api/scripts/{id}/cancel", post(routes::cancel_run))
        .with_state(state)
}

/// CORS from `[server].cors_origin`: `*` or a comma separated origin list.
pub fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin.trim() == "*" {
        return Ok(layer.allow_origin(Any));
    }

    let origins = origin
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            HeaderValue::from_str(s)
                .map_err(|e| RuncastError::ConfigError(format!("invalid CORS origin '{s}': {e}")))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

/// Serve the control surface until Ctrl-C.
pub async fn serve(config: &ConfigFile, scripts: ScriptCommand) -> Result<()> {
    let registry = ProcessRegistry::new(Arc::new(ProcessRunner::new()), config.registry.limits);
    let sweeper = registry.spawn_sweeper(config.registry.sweep_interval);

    let app = router(AppState::new(registry, scripts))
        .layer(cors_layer(&config.server.cors_origin)?);

    let listener = TcpListener::bind(config.server.bind).await?;
    info!(addr = %config.server.bind, "control surface listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    sweeper.abort();
    Ok(())
}

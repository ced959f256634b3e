//! REST API server module
//!
//! Exposes the sync manager over HTTP: per-file module tables, sync batches,
//! confirmed delete/export and a server-sent event stream. Every file route
//! forwards the caller's `Authorization: Bearer` credential to the
//! accounting service.

use crate::{Config, Error, Result, SyncManager};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Files
/// - `GET /files/:file_id` - Load file metadata and company link
/// - `GET /files/:file_id/status` - Persisted module statuses
/// - `POST /files/:file_id/sync` - Run a sync batch
/// - `POST /files/:file_id/refresh` - Re-pull sync dates and record counts
/// - `GET /files/:file_id/connect` - Company authorization URL
/// - `POST /files/:file_id/disconnect` - Unlink the company
///
/// ## Modules
/// - `GET /modules` - Module registry
/// - `GET /files/:file_id/modules` - Per-file module table
/// - `DELETE /files/:file_id/modules/:module?confirm=true` - Delete module data
/// - `GET /files/:file_id/modules/:module/export/:format?confirm=true` - Export a module
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
///
/// Everything except `/health`, `/openapi.json` and the Swagger UI answers
/// 401 without an `Authorization: Bearer` header.
pub fn create_router(manager: Arc<SyncManager>, config: Arc<Config>) -> Router {
    let api = &config.server.api;

    let mut router = Router::new()
        .merge(file_routes())
        .merge(module_routes())
        .merge(event_routes())
        .route_layer(middleware::from_fn(auth::require_bearer))
        .merge(public_routes());
    if api.swagger_ui {
        router = router.merge(
            SwaggerUi::new("/swagger-ui").url("/swagger-ui/openapi.json", ApiDoc::openapi()),
        );
    }

    let router = router
        .with_state(AppState::new(manager, config.clone()))
        .layer(TraceLayer::new_for_http());

    if api.cors_enabled {
        router.layer(build_cors_layer(&api.cors_origins))
    } else {
        router
    }
}

fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files/:file_id", get(routes::get_file))
        .route("/files/:file_id/status", get(routes::get_file_status))
        .route("/files/:file_id/sync", post(routes::sync_file))
        .route("/files/:file_id/refresh", post(routes::refresh_file))
        .route("/files/:file_id/connect", get(routes::connect_file))
        .route("/files/:file_id/disconnect", post(routes::disconnect_file))
}

fn module_routes() -> Router<AppState> {
    Router::new()
        .route("/modules", get(routes::list_modules))
        .route("/files/:file_id/modules", get(routes::list_file_modules))
        .route("/files/:file_id/modules/:module", delete(routes::delete_module))
        .route(
            "/files/:file_id/modules/:module/export/:format",
            get(routes::export_module),
        )
}

fn event_routes() -> Router<AppState> {
    Router::new().route("/events", get(routes::event_stream))
}

/// Routes served without a credential
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
}

/// CORS for the configured origins; `"*"` or an empty list means any origin
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| o.parse::<HeaderValue>().ok()))
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server on the configured bind address.
///
/// Runs until the listener fails or the task is aborted.
///
/// # Example
///
/// ```no_run
/// use qbo_sync::{Config, SyncManager};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let manager = Arc::new(SyncManager::open((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// qbo_sync::api::start_api_server(manager, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(manager: Arc<SyncManager>, config: Arc<Config>) -> Result<()> {
    let address = config.server.api.bind_address;
    let listener = TcpListener::bind(address).await.map_err(Error::Io)?;
    tracing::info!(%address, "API server listening");

    axum::serve(listener, create_router(manager, config))
        .await
        .map_err(|e| Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

//! System handlers: health, OpenAPI, events.

use crate::api::AppState;
use crate::types::Event;
use axum::{
    Json,
    extract::State,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use serde_json::json;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    Json(<crate::api::ApiDoc as utoipa::OpenApi>::openapi())
}

/// SSE event name for an event
fn event_name(event: &Event) -> &'static str {
    match event {
        Event::BatchStarted { .. } => "batch_started",
        Event::ModuleStatusChanged { .. } => "module_status_changed",
        Event::ModuleSyncFailed { .. } => "module_sync_failed",
        Event::BatchFinished { .. } => "batch_finished",
        Event::SyncDatesRefreshed { .. } => "sync_dates_refreshed",
        Event::SummaryRefreshed { .. } => "summary_refreshed",
        Event::RefreshFailed { .. } => "refresh_failed",
        Event::ModuleDeleted { .. } => "module_deleted",
        Event::ModuleExported { .. } => "module_exported",
        Event::Disconnected { .. } => "disconnected",
    }
}

/// GET /events - Server-sent events stream
#[utoipa::path(
    get,
    path = "/events",
    tag = "system",
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream"),
        (status = 401, description = "Missing bearer credential", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = []))
)]
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let stream = BroadcastStream::new(state.manager.subscribe())
        .filter_map(|received| to_sse(received).map(Ok));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Frame one broadcast item; a lagging subscriber gets an `error` frame
/// saying how many events it missed
fn to_sse(received: Result<Event, BroadcastStreamRecvError>) -> Option<SseEvent> {
    match received {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(data) => Some(SseEvent::default().event(event_name(&event)).data(data)),
            Err(e) => {
                tracing::warn!(error = %e, "dropping event that failed to serialize");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "event subscriber lagged");
            Some(
                SseEvent::default()
                    .event("error")
                    .data(json!({ "error": "lagged", "skipped": skipped }).to_string()),
            )
        }
    }
}

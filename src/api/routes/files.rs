//! File handlers: lookup, status, sync batches, refresh and company link.

use super::{ConnectResponse, FileStatusResponse, SyncRequest};
use crate::api::AppState;
use crate::api::auth::BearerCredential;
use crate::registry::Selection;
use crate::types::FileId;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /files/:file_id - Load file metadata and company link
#[utoipa::path(
    get,
    path = "/files/{file_id}",
    tag = "files",
    params(
        ("file_id" = String, Path, description = "File identifier")
    ),
    responses(
        (status = 200, description = "Resolved file context", body = crate::types::FileContext),
        (status = 401, description = "Missing or malformed bearer token", body = crate::error::ApiError),
        (status = 502, description = "Accounting service failed", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_file(
    State(state): State<AppState>,
    BearerCredential(credential): BearerCredential,
    Path(file_id): Path<String>,
) -> Response {
    match state
        .manager
        .open_file(&credential, &FileId::from(file_id))
        .await
    {
        Ok(context) => (StatusCode::OK, Json(context)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /files/:file_id/status - Persisted module statuses
#[utoipa::path(
    get,
    path = "/files/{file_id}/status",
    tag = "files",
    params(
        ("file_id" = String, Path, description = "File identifier")
    ),
    responses(
        (status = 200, description = "Status of every module touched for the file", body = FileStatusResponse),
        (status = 401, description = "Missing bearer credential", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_file_status(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Response {
    let file_id = FileId::from(file_id);
    match state.manager.statuses(&file_id).await {
        Ok(statuses) => {
            let syncing = state.manager.is_syncing(&file_id);
            (
                StatusCode::OK,
                Json(FileStatusResponse {
                    file_id,
                    statuses,
                    syncing,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(file_id = %file_id, error = %e, "failed to read module statuses");
            e.into_response()
        }
    }
}

/// POST /files/:file_id/sync - Run a sync batch
///
/// Responds once every selected module has settled. Per-module failures are
/// reported in the body; the request itself only fails when the batch could
/// not start.
#[utoipa::path(
    post,
    path = "/files/{file_id}/sync",
    tag = "files",
    params(
        ("file_id" = String, Path, description = "File identifier")
    ),
    request_body = SyncRequest,
    responses(
        (status = 200, description = "Batch finished", body = crate::types::BatchReport),
        (status = 400, description = "Empty selection or unknown module", body = crate::error::ApiError),
        (status = 401, description = "Missing or malformed bearer token", body = crate::error::ApiError),
        (status = 409, description = "A batch is already running for this file", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn sync_file(
    State(state): State<AppState>,
    BearerCredential(credential): BearerCredential,
    Path(file_id): Path<String>,
    Json(request): Json<SyncRequest>,
) -> Response {
    let file_id = FileId::from(file_id);
    let result = if request.all {
        state.manager.sync_all(&credential, &file_id).await
    } else {
        let selection = request.modules.unwrap_or_else(Selection::new);
        state.manager.run_sync(&credential, &file_id, &selection).await
    };

    match result {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /files/:file_id/refresh - Re-pull sync dates and record counts
#[utoipa::path(
    post,
    path = "/files/{file_id}/refresh",
    tag = "files",
    params(
        ("file_id" = String, Path, description = "File identifier")
    ),
    responses(
        (status = 200, description = "Fresh sync dates and counts", body = crate::types::RefreshSnapshot),
        (status = 401, description = "Missing or malformed bearer token", body = crate::error::ApiError),
        (status = 409, description = "File is not connected", body = crate::error::ApiError),
        (status = 502, description = "Refresh failed", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn refresh_file(
    State(state): State<AppState>,
    BearerCredential(credential): BearerCredential,
    Path(file_id): Path<String>,
) -> Response {
    match state
        .manager
        .refresh_file(&credential, &FileId::from(file_id))
        .await
    {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /files/:file_id/connect - Company authorization URL
#[utoipa::path(
    get,
    path = "/files/{file_id}/connect",
    tag = "files",
    params(
        ("file_id" = String, Path, description = "File identifier")
    ),
    responses(
        (status = 200, description = "URL to start the company authorization", body = ConnectResponse),
        (status = 401, description = "Missing or malformed bearer token", body = crate::error::ApiError),
        (status = 502, description = "Accounting service failed", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn connect_file(
    State(state): State<AppState>,
    BearerCredential(credential): BearerCredential,
    Path(file_id): Path<String>,
) -> Response {
    match state
        .manager
        .connect_url(&credential, &FileId::from(file_id))
        .await
    {
        Ok(url) => (StatusCode::OK, Json(ConnectResponse { url })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /files/:file_id/disconnect - Unlink the company
#[utoipa::path(
    post,
    path = "/files/{file_id}/disconnect",
    tag = "files",
    params(
        ("file_id" = String, Path, description = "File identifier")
    ),
    responses(
        (status = 204, description = "File disconnected"),
        (status = 401, description = "Missing or malformed bearer token", body = crate::error::ApiError),
        (status = 502, description = "Accounting service failed", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn disconnect_file(
    State(state): State<AppState>,
    BearerCredential(credential): BearerCredential,
    Path(file_id): Path<String>,
) -> Response {
    match state
        .manager
        .disconnect(&credential, &FileId::from(file_id))
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

//! Module handlers: registry, per-file module table, delete and export.

use super::ConfirmQuery;
use crate::api::AppState;
use crate::api::auth::BearerCredential;
use crate::export::{AutoConfirm, Confirmation, Decline};
use crate::types::{ExportFormat, FileId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// Header naming the refresh step that failed after a successful export
pub const REFRESH_FAILED_HEADER: &str = "x-refresh-failed";

fn confirmation_for(query: &ConfirmQuery) -> &'static dyn Confirmation {
    if query.confirm {
        &AutoConfirm as &dyn Confirmation
    } else {
        &Decline
    }
}

/// `Content-Disposition` value for a downloaded artifact
///
/// Non-ASCII names get an RFC 5987 `filename*` next to an ASCII fallback.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if fallback == file_name {
        format!("attachment; filename=\"{}\"", file_name)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(file_name)
        )
    }
}

/// GET /modules - Module registry
#[utoipa::path(
    get,
    path = "/modules",
    tag = "modules",
    responses(
        (status = 200, description = "Syncable modules in display order", body = Vec<crate::registry::ModuleDescriptor>),
        (status = 401, description = "Missing bearer credential", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_modules(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.manager.registry().list().to_vec()))
}

/// GET /files/:file_id/modules - Per-file module table
#[utoipa::path(
    get,
    path = "/files/{file_id}/modules",
    tag = "modules",
    params(
        ("file_id" = String, Path, description = "File identifier")
    ),
    responses(
        (status = 200, description = "One row per registered module", body = Vec<crate::types::ModuleRow>),
        (status = 401, description = "Missing bearer credential", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_file_modules(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Response {
    match state.manager.module_rows(&FileId::from(file_id)).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to build module table");
            e.into_response()
        }
    }
}

/// DELETE /files/:file_id/modules/:module - Delete remote data of a module
#[utoipa::path(
    delete,
    path = "/files/{file_id}/modules/{module}",
    tag = "modules",
    params(
        ("file_id" = String, Path, description = "File identifier"),
        ("module" = String, Path, description = "Module key"),
        ConfirmQuery
    ),
    responses(
        (status = 200, description = "Data deleted; refresh result included", body = crate::types::DeleteReport),
        (status = 401, description = "Missing or malformed bearer token", body = crate::error::ApiError),
        (status = 404, description = "Unknown module", body = crate::error::ApiError),
        (status = 409, description = "File is not connected", body = crate::error::ApiError),
        (status = 412, description = "Not confirmed", body = crate::error::ApiError),
        (status = 422, description = "Module has no records", body = crate::error::ApiError),
        (status = 502, description = "Accounting service failed", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_module(
    State(state): State<AppState>,
    BearerCredential(credential): BearerCredential,
    Path((file_id, module)): Path<(String, String)>,
    Query(query): Query<ConfirmQuery>,
) -> Response {
    match state
        .manager
        .delete_module(
            &credential,
            &FileId::from(file_id),
            &module,
            confirmation_for(&query),
        )
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /files/:file_id/modules/:module/export/:format - Download a module export
///
/// The body is the artifact as received from the service. A failed
/// post-export refresh does not fail the download; it is reported in the
/// `x-refresh-failed` header instead.
#[utoipa::path(
    get,
    path = "/files/{file_id}/modules/{module}/export/{format}",
    tag = "modules",
    params(
        ("file_id" = String, Path, description = "File identifier"),
        ("module" = String, Path, description = "Module key"),
        ("format" = String, Path, description = "Export format: excel or csv"),
        ConfirmQuery
    ),
    responses(
        (status = 200, description = "Export artifact", content_type = "application/octet-stream"),
        (status = 400, description = "Unknown format or no destination region", body = crate::error::ApiError),
        (status = 401, description = "Missing or malformed bearer token", body = crate::error::ApiError),
        (status = 404, description = "Unknown module", body = crate::error::ApiError),
        (status = 409, description = "File is not connected", body = crate::error::ApiError),
        (status = 412, description = "Not confirmed", body = crate::error::ApiError),
        (status = 422, description = "Module has no records", body = crate::error::ApiError),
        (status = 502, description = "Accounting service failed", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn export_module(
    State(state): State<AppState>,
    BearerCredential(credential): BearerCredential,
    Path((file_id, module, format)): Path<(String, String, String)>,
    Query(query): Query<ConfirmQuery>,
) -> Response {
    let format = match format.parse::<ExportFormat>() {
        Ok(format) => format,
        Err(e) => return e.into_response(),
    };

    let report = match state
        .manager
        .export_module(
            &credential,
            &FileId::from(file_id),
            &module,
            format,
            confirmation_for(&query),
        )
        .await
    {
        Ok(report) => report,
        Err(e) => return e.into_response(),
    };

    let artifact = report.artifact;
    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, artifact.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&artifact.file_name),
            ),
        ],
        artifact.data,
    )
        .into_response();

    if let Some(failure) = report.refresh.failure() {
        response.headers_mut().insert(
            REFRESH_FAILED_HEADER,
            HeaderValue::from_static(failure.operation.as_str()),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_plain_name() {
        assert_eq!(
            content_disposition("Acme_USA_invoice.xlsx"),
            "attachment; filename=\"Acme_USA_invoice.xlsx\""
        );
    }

    #[test]
    fn test_content_disposition_encodes_non_ascii() {
        let value = content_disposition("Café \"Co\"_UK_bill.csv");
        assert!(value.starts_with("attachment; filename=\"Caf_ _Co__UK_bill.csv\""));
        assert!(value.contains("filename*=UTF-8''Caf%C3%A9%20%22Co%22_UK_bill.csv"));
    }
}

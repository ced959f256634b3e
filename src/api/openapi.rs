//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the qbo-sync REST API
//! generated at compile time with utoipa.

use utoipa::OpenApi;

/// OpenAPI documentation for the qbo-sync REST API
///
/// The document is served at:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "qbo-sync REST API",
        version = "0.1.0",
        description = "Per-module QuickBooks Online synchronization: sync batches, durable status, confirmed delete and export",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790", description = "Local development server")
    ),
    paths(
        // Files
        crate::api::routes::get_file,
        crate::api::routes::get_file_status,
        crate::api::routes::sync_file,
        crate::api::routes::refresh_file,
        crate::api::routes::connect_file,
        crate::api::routes::disconnect_file,

        // Modules
        crate::api::routes::list_modules,
        crate::api::routes::list_file_modules,
        crate::api::routes::delete_module,
        crate::api::routes::export_module,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(
        schemas(
            // Identifiers and statuses
            crate::types::FileId,
            crate::types::CompanyId,
            crate::types::SyncStatus,
            crate::types::StatusRecord,
            crate::types::SyncDateRecord,
            crate::types::ModuleCount,
            crate::types::ModuleSummary,
            crate::types::Region,
            crate::types::ExportFormat,

            // File context
            crate::types::FileContext,
            crate::types::FileInfo,
            crate::types::QboConnection,
            crate::types::ModuleRow,

            // Reports
            crate::types::BatchReport,
            crate::types::ModuleOutcome,
            crate::types::RefreshOutcome,
            crate::types::RefreshSnapshot,
            crate::types::DeleteReport,
            crate::types::Event,

            // Registry
            crate::registry::ModuleDescriptor,
            crate::registry::Selection,

            // Request/response types
            crate::api::routes::ConfirmQuery,
            crate::api::routes::SyncRequest,
            crate::api::routes::ConnectResponse,
            crate::api::routes::FileStatusResponse,

            // Errors
            crate::error::ApiError,
            crate::error::ErrorDetail,
            crate::error::RemoteFailure,
            crate::error::RemoteFailureKind,
            crate::error::RemoteOperation,
            crate::error::RefreshFailure,
        )
    ),
    tags(
        (name = "files", description = "File lookup, module status, sync batches and company link"),
        (name = "modules", description = "Module registry, per-file module table, delete and export"),
        (name = "system", description = "Health check, OpenAPI spec and event stream")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the bearer scheme forwarded to the accounting service
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .build(),
                ),
            );
        }
    }
}

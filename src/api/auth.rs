//! Bearer credential extraction for the REST API
//!
//! Every route except `/health`, `/openapi.json` and the Swagger UI requires
//! an `Authorization: Bearer <token>` header. [`require_bearer`] enforces it
//! for whole route groups; [`BearerCredential`] hands the token to handlers
//! that act on the caller's behalf against the accounting service. The token
//! is passed through untouched; validating it is the service's job.

use crate::error::ApiError;
use crate::types::Credential;
use async_trait::async_trait;
use axum::{
    Json,
    extract::{FromRequestParts, Request},
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// The caller's credential, taken from the Authorization header
///
/// # Examples
///
/// ```no_run
/// use qbo_sync::api::auth::BearerCredential;
///
/// async fn handler(BearerCredential(credential): BearerCredential) {
///     let _ = credential.token();
/// }
/// ```
#[derive(Clone, Debug)]
pub struct BearerCredential(pub Credential);

#[async_trait]
impl<S> FromRequestParts<S> for BearerCredential
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_from_headers(&parts.headers).map(BearerCredential)
    }
}

/// Middleware rejecting requests that carry no bearer credential
///
/// Applied with `route_layer` so unknown paths still answer 404.
pub async fn require_bearer(request: Request, next: Next) -> Response {
    match bearer_from_headers(request.headers()) {
        Ok(_) => next.run(request).await,
        Err(rejection) => rejection,
    }
}

fn bearer_from_headers(headers: &HeaderMap) -> Result<Credential, Response> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| unauthorized_response("Missing Authorization header"))?;

    value
        .to_str()
        .ok()
        .and_then(parse_bearer)
        .map(Credential::bearer)
        .ok_or_else(|| unauthorized_response("Authorization header must be a bearer token"))
}

/// Token of a `Bearer <token>` header value (scheme is case-insensitive)
fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Create a 401 Unauthorized response with JSON error body
fn unauthorized_response(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ApiError::unauthorized(message))).into_response()
}

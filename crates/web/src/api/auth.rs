//! Bearer token authentication.

use axum::http::{header, HeaderMap};
use tracing::debug;

use crate::api::status::AppError;
use crate::AppState;

/// The caller identified by a verified token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// Email claim; doubles as the reader user id.
    pub email: String,
    pub name: Option<String>,
}

/// Verify the `Authorization: Bearer` header and return the caller.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("missing or invalid Authorization header".into()))?;

    let claims = state.tokens.verify(token).map_err(|e| {
        debug!(error = %e, "rejected bearer token");
        AppError::Unauthorized("token expired or invalid".into())
    })?;

    Ok(CurrentUser {
        email: claims.email,
        name: claims.name,
    })
}

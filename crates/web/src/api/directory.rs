//! Person and group lookup endpoints.
//!
//! Directory backends block (LDAP), so every lookup runs on the blocking pool.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use elog_core::directory::{Group, Person};
use elog_core::errors::DirectoryError;

use crate::api::auth::authenticate;
use crate::api::status::AppError;
use crate::AppState;

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/people", get(search_people))
        .route("/api/v1/people/by-email/:email", get(person_by_email))
        .route("/api/v1/groups", get(search_groups))
}

/// Run a directory call off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, DirectoryError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("directory task failed: {}", e)))?;
    Ok(result?)
}

fn require_prefix(query: SearchQuery) -> Result<String, AppError> {
    let prefix = query.search.trim().to_string();
    if prefix.is_empty() {
        return Err(AppError::BadRequest("search prefix must not be empty".into()));
    }
    Ok(prefix)
}

async fn search_people(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Person>>, AppError> {
    authenticate(&state, &headers)?;
    let prefix = require_prefix(query)?;

    let people = state.directory.people.clone();
    let found = blocking(move || people.find_by_name_prefix(&prefix)).await?;
    Ok(Json(found))
}

async fn person_by_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(email): Path<String>,
) -> Result<Json<Person>, AppError> {
    authenticate(&state, &headers)?;

    let people = state.directory.people.clone();
    let lookup = email.clone();
    blocking(move || people.find_by_email(&lookup))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no person with email '{}'", email)))
}

async fn search_groups(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Group>>, AppError> {
    authenticate(&state, &headers)?;
    let prefix = require_prefix(query)?;

    let groups = state.directory.groups.clone();
    let found = blocking(move || groups.find_by_name_prefix(&prefix)).await?;
    Ok(Json(found))
}

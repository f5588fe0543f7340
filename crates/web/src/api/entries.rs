//! Entry import and read endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use elog_core::import_entry;
use elog_core::mapper::LogMapper;
use elog_core::models::{EntryImportRequest, LogEntryView};

use crate::api::auth::authenticate;
use crate::api::status::AppError;
use crate::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub logbook: Option<String>,
}

#[derive(Serialize)]
struct EntryListResponse {
    entries: Vec<LogEntryView>,
    total: usize,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/import", post(import))
        .route("/api/v1/entries", get(list_entries))
        .route("/api/v1/entries/:id", get(get_entry))
}

async fn import(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<EntryImportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LogEntryView>), AppError> {
    let user = authenticate(&state, &headers)?;
    // Malformed bodies are validation failures like any other.
    let Json(body) = body?;

    let record = import_entry(&state.db, body)?;
    info!(
        id = %record.id,
        imported_by = %user.email,
        importer_name = user.name.as_deref().unwrap_or(""),
        "entry imported"
    );

    Ok((StatusCode::CREATED, Json(LogMapper::to_view(&record))))
}

async fn list_entries(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<EntryListResponse>, AppError> {
    let user = authenticate(&state, &headers)?;
    let limit = query.limit.unwrap_or(50).min(500);

    let records = match query.logbook {
        Some(logbook) => {
            if !state.db.can_read(&user.email, std::slice::from_ref(&logbook))? {
                return Err(AppError::Forbidden(format!(
                    "no read access to logbook '{}'",
                    logbook
                )));
            }
            state.db.list_logs_in_logbook(&logbook, limit)?
        }
        None => state.db.list_readable_logs(&user.email, limit)?,
    };

    let entries = LogMapper::to_views(&records);
    let total = entries.len();
    Ok(Json(EntryListResponse { entries, total }))
}

async fn get_entry(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<LogEntryView>, AppError> {
    let user = authenticate(&state, &headers)?;

    let record = state
        .db
        .get_log(&id)?
        .ok_or_else(|| AppError::NotFound(format!("entry '{}' not found", id)))?;

    if !state.db.can_read(&user.email, &record.logbooks)? {
        return Err(AppError::Forbidden(format!("no read access to entry '{}'", id)));
    }

    Ok(Json(LogMapper::to_view(&record)))
}

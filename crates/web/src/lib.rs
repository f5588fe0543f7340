//! ELOG web server and REST API.
//!
//! Provides an Axum-based HTTP server with:
//! - Health endpoint
//! - Entry import and read API
//! - Person and group directory lookups
//! - Bearer token authentication

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use elog_core::db::Database;
use elog_core::directory::Directory;
use elog_core::token::TokenIssuer;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub db: Database,
    /// Verifies bearer tokens on incoming requests.
    pub tokens: TokenIssuer,
    pub directory: Directory,
}

/// Build the API router around `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api::status::routes())
        .merge(api::entries::routes())
        .merge(api::directory::routes())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024)) // 2 MB max request body
        .with_state(state)
}

/// The web server.
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server with the given dependencies.
    pub fn new(db: Database, tokens: TokenIssuer, directory: Directory) -> Self {
        let state = Arc::new(AppState {
            db,
            tokens,
            directory,
        });
        Self { state }
    }

    /// Start the web server, listening on the given address.
    pub async fn start(self, listen_addr: &str) -> anyhow::Result<()> {
        let addr: SocketAddr = listen_addr.parse()?;

        let cors = CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

        let app = router(self.state)
            .layer(TraceLayer::new_for_http())
            .layer(cors);

        info!(addr = %addr, "starting web server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

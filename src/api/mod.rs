//! HTTP API module for the Memo Service
//!
//! Provides REST endpoints for customer memos.

mod auth;
mod error;
pub mod routes;

use crate::config::{Config, CorsConfig};
use crate::db::Database;
use crate::error::{CoreError, Result};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::INTERNAL_SERVER_ERROR_BODY;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection
    pub db: Arc<Database>,
    /// Maximum memo length in characters
    pub max_content_length: usize,
    /// CORS settings
    pub cors: CorsConfig,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: &Config) -> Self {
        AppState {
            db,
            max_content_length: config.memo.max_content_length,
            cors: config.cors.clone(),
            max_body_bytes: config.server.max_body_bytes,
        }
    }
}

/// Start the HTTP API server
pub async fn serve(addr: SocketAddr, db: Arc<Database>, config: &Config) -> Result<()> {
    let app = create_router(AppState::new(db, config));

    // Check if port is already in use (another instance running)
    if tokio::net::TcpStream::connect(addr).await.is_ok() {
        tracing::error!(
            "Port {} is already in use; another memo-service instance may be running. \
             Use `curl http://{}/health` to check.",
            addr.port(),
            addr
        );
        return Err(CoreError::Config(format!(
            "Port {} already in use",
            addr.port()
        )));
    }

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build the CORS layer.
///
/// Credentialed CORS cannot use wildcards, so "any origin" mirrors the
/// request's Origin header and methods/headers are listed explicitly.
fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins = if cors.allows_any_origin() {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = cors
            .allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_credentials(cors.allow_credentials)
}

/// Create the API router with all routes
pub(crate) fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors);

    let memo_routes = Router::new()
        .route(
            "/customers/:customer_id/memos",
            get(routes::list_memos).post(routes::create_memo),
        )
        .route(
            "/customers/:customer_id/memos/:memo_id",
            patch(routes::update_memo).delete(routes::delete_memo),
        )
        // Every memo route sits behind the authorization gate
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_customer_facing,
        ));

    Router::new()
        // Health check (public, no auth required)
        .route("/health", get(routes::health))
        .nest("/api", memo_routes)
        // Global middleware
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes over the ledger engine
//! - JSON error responses
//! - Request and response types

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use saldo_core::ledger::{LedgerEngine, LedgerStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
pub struct AppState<S> {
    /// The ledger engine.
    pub engine: Arc<LedgerEngine<S>>,
}

impl<S> AppState<S> {
    /// Wraps an engine.
    pub fn new(engine: LedgerEngine<S>) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

/// Creates the main application router.
pub fn create_router<S: LedgerStore>(state: AppState<S>) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes::<S>())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

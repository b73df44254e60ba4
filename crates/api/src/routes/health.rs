//! Health check endpoints.

use axum::{Json, Router, extract::State, routing::get};
use saldo_core::ledger::LedgerStore;
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Engine tuning in effect.
    pub ledger: LedgerSettingsResponse,
}

/// Ledger engine settings reported by the health check.
#[derive(Serialize)]
pub struct LedgerSettingsResponse {
    /// Accounts recalculated at once by a tenant run.
    pub fleet_concurrency: usize,
    /// Per-account recalculation timeout.
    pub account_timeout_secs: u64,
    /// Backdated inserts recompute the chain immediately.
    pub repair_on_backdated_insert: bool,
}

async fn health_check<S: LedgerStore>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    let settings = state.engine.settings();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        ledger: LedgerSettingsResponse {
            fleet_concurrency: settings.fleet_concurrency,
            account_timeout_secs: settings.account_timeout.as_secs(),
            repair_on_backdated_insert: settings.repair_on_backdated_insert,
        },
    })
}

/// Creates health check routes.
pub fn routes<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new().route("/health", get(health_check::<S>))
}

//! API route definitions.

use axum::Router;
use saldo_core::ledger::LedgerStore;

use crate::AppState;

pub mod health;
pub mod movements;
pub mod recalculate;

#[cfg(test)]
mod test_support;

/// Creates the API router with all routes.
pub fn api_routes<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new()
        .merge(health::routes())
        .merge(movements::routes())
        .merge(recalculate::routes())
}

//! Recalculation routes: single account, tenant fleet, balance sync and audit.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use saldo_core::ledger::{
    AccountRecalcOutcome, AccountRecalcStatus, AuditReport, LedgerStore, RecalcResult,
};
use saldo_shared::types::{AccountId, TenantId, format_money};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::ledger_error_response;

/// Creates the recalculation routes.
pub fn routes<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/accounts/{account_id}/recalculate",
            post(recalculate_account::<S>),
        )
        .route(
            "/accounts/{account_id}/sync-balance",
            post(sync_balance::<S>),
        )
        .route("/accounts/{account_id}/audit", get(audit_account::<S>))
        .route(
            "/tenants/{tenant_id}/recalculate",
            post(recalculate_tenant::<S>),
        )
}

/// Response for a single-account recalculation.
#[derive(Debug, Serialize)]
pub struct RecalcResponse {
    /// Recalculated account.
    pub account_id: Uuid,
    /// Rows rewritten.
    pub updated_count: usize,
    /// Balance after the last non-cancelled movement.
    pub final_balance: String,
    /// Non-cancelled movements.
    pub movement_count: usize,
}

impl From<RecalcResult> for RecalcResponse {
    fn from(r: RecalcResult) -> Self {
        Self {
            account_id: r.account_id.into_inner(),
            updated_count: r.updated_count,
            final_balance: format_money(r.final_balance),
            movement_count: r.movement_count,
        }
    }
}

/// Response for an audit.
#[derive(Debug, Serialize)]
pub struct AuditResponse {
    /// Audited account.
    pub account_id: Uuid,
    /// Non-cancelled movements.
    pub movement_count: usize,
    /// Movements with a wrong running balance.
    pub drifted_count: usize,
    /// Balance the chain adds up to.
    pub computed_balance: String,
    /// Balance cached on the account.
    pub cached_balance: String,
    /// Whether the cached balance is right.
    pub cached_balance_matches: bool,
    /// Whether nothing needs repair.
    pub consistent: bool,
}

impl From<AuditReport> for AuditResponse {
    fn from(r: AuditReport) -> Self {
        Self {
            account_id: r.account_id.into_inner(),
            movement_count: r.movement_count,
            drifted_count: r.drifted_count,
            computed_balance: format_money(r.computed_balance),
            cached_balance: format_money(r.cached_balance),
            cached_balance_matches: r.cached_balance_matches,
            consistent: r.is_consistent(),
        }
    }
}

/// One account's line in a tenant recalculation.
#[derive(Debug, Serialize)]
pub struct AccountOutcomeResponse {
    /// The account.
    pub account_id: Uuid,
    /// `ok` or `failed`.
    pub status: &'static str,
    /// Final balance (ok only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_balance: Option<String>,
    /// Rows rewritten (ok only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_count: Option<usize>,
    /// Error code (failed only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Failure reason (failed only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<AccountRecalcOutcome> for AccountOutcomeResponse {
    fn from(o: AccountRecalcOutcome) -> Self {
        let account_id = o.account_id.into_inner();
        match o.status {
            AccountRecalcStatus::Ok {
                final_balance,
                updated_count,
            } => Self {
                account_id,
                status: "ok",
                final_balance: Some(format_money(final_balance)),
                updated_count: Some(updated_count),
                error_code: None,
                message: None,
            },
            AccountRecalcStatus::Failed {
                error_code,
                message,
            } => Self {
                account_id,
                status: "failed",
                final_balance: None,
                updated_count: None,
                error_code: Some(error_code.to_ascii_lowercase()),
                message: Some(message),
            },
        }
    }
}

/// POST `/accounts/{account_id}/recalculate` - Recompute an account's running balances.
async fn recalculate_account<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(account_id): Path<Uuid>,
) -> Response {
    match state.engine.recalculate_account(account_id.into()).await {
        Ok(result) => (StatusCode::OK, Json(RecalcResponse::from(result))).into_response(),
        Err(e) => ledger_error_response(e),
    }
}

/// POST `/accounts/{account_id}/sync-balance` - Refresh the cached balance only.
async fn sync_balance<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(account_id): Path<Uuid>,
) -> Response {
    let account_id = AccountId::from(account_id);
    match state.engine.sync_current_balance(account_id).await {
        Ok(balance) => (
            StatusCode::OK,
            Json(json!({
                "account_id": account_id,
                "cached_balance": format_money(balance)
            })),
        )
            .into_response(),
        Err(e) => ledger_error_response(e),
    }
}

/// GET `/accounts/{account_id}/audit` - Report drift without repairing it.
async fn audit_account<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(account_id): Path<Uuid>,
) -> Response {
    match state.engine.audit_account(account_id.into()).await {
        Ok(report) => (StatusCode::OK, Json(AuditResponse::from(report))).into_response(),
        Err(e) => ledger_error_response(e),
    }
}

/// POST `/tenants/{tenant_id}/recalculate` - Recompute every account of a tenant.
///
/// Per-account failures are reported in the body; the call itself succeeds.
async fn recalculate_tenant<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(tenant_id): Path<Uuid>,
) -> Response {
    let tenant_id = TenantId::from(tenant_id);
    match state.engine.recalculate_all_accounts(tenant_id).await {
        Ok(report) => {
            let succeeded = report.succeeded();
            let fixed = report.fixed_count();
            let accounts = report.outcomes.len();
            info!(
                tenant_id = %tenant_id,
                accounts,
                succeeded,
                fixed,
                "Tenant recalculation requested"
            );

            let results: Vec<AccountOutcomeResponse> =
                report.outcomes.into_iter().map(Into::into).collect();
            (
                StatusCode::OK,
                Json(json!({
                    "tenant_id": tenant_id,
                    "summary": {
                        "accounts": accounts,
                        "succeeded": succeeded,
                        "failed": accounts - succeeded,
                        "fixed": fixed
                    },
                    "results": results
                })),
            )
                .into_response()
        }
        Err(e) => ledger_error_response(e),
    }
}

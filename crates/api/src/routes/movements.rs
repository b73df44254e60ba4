//! Movement routes: the write path and the query gateway.

use std::collections::BTreeSet;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use saldo_core::ledger::{
    LedgerError, LedgerStore, Movement, MovementAmount, MovementFilter, MovementStatus,
    NewMovement,
};
use saldo_shared::types::{AccountId, Page, PageRequest, TenantId, format_money};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::recalculate::RecalcResponse;
use crate::AppState;
use crate::error::{bad_request, ledger_error_response};

/// Creates the movement routes.
pub fn routes<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/accounts/{account_id}/movements",
            get(list_account_movements::<S>).post(create_movement::<S>),
        )
        .route("/movements/{movement_id}/status", patch(update_status::<S>))
        .route("/movements/{movement_id}/date", patch(update_date::<S>))
        .route("/tenants/{tenant_id}/movements", get(list_tenant_movements::<S>))
}

/// Request body for recording a movement.
///
/// Either `amount` (signed) or `entry_amount`/`exit_amount` must be given.
#[derive(Debug, Deserialize)]
pub struct CreateMovementRequest {
    /// Business date.
    pub movement_date: NaiveDate,
    /// Signed amount: positive for entries, negative for exits.
    pub amount: Option<Decimal>,
    /// Inflow amount.
    pub entry_amount: Option<Decimal>,
    /// Outflow amount.
    pub exit_amount: Option<Decimal>,
    /// Initial status (default: pending).
    pub status: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Notes.
    pub notes: Option<String>,
}

impl CreateMovementRequest {
    fn signed_amount(&self) -> Result<Decimal, LedgerError> {
        match (self.amount, self.entry_amount, self.exit_amount) {
            (None, None, None) => Err(LedgerError::Validation(
                "amount or entry_amount/exit_amount is required".to_string(),
            )),
            (Some(amount), None, None) => Ok(amount),
            (None, entry, exit) => MovementAmount::from_entry_exit(
                entry.unwrap_or_default(),
                exit.unwrap_or_default(),
            )
            .map(|amount| amount.signed()),
            _ => Err(LedgerError::Validation(
                "amount cannot be combined with entry_amount/exit_amount".to_string(),
            )),
        }
    }

    fn status(&self) -> Result<MovementStatus, LedgerError> {
        self.status
            .as_deref()
            .map_or(Ok(MovementStatus::Pending), str::parse)
    }
}

/// Request body for a status change.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// New status: pending, settled, transferred or cancelled.
    pub status: String,
}

/// Request body for a date edit.
#[derive(Debug, Deserialize)]
pub struct UpdateDateRequest {
    /// New business date.
    pub movement_date: NaiveDate,
}

/// Query parameters for movement listings.
#[derive(Debug, Default, Deserialize)]
pub struct MovementQuery {
    /// Earliest movement date (inclusive).
    pub date_from: Option<NaiveDate>,
    /// Latest movement date (inclusive).
    pub date_to: Option<NaiveDate>,
    /// Filter by status.
    pub status: Option<String>,
    /// Filter by direction: entry or exit.
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
    /// Minimum amount magnitude.
    pub value_min: Option<Decimal>,
    /// Maximum amount magnitude.
    pub value_max: Option<Decimal>,
    /// Page size.
    pub limit: Option<i64>,
    /// Rows to skip.
    pub offset: Option<i64>,
    /// Comma-separated account IDs (tenant listing only).
    pub account_ids: Option<String>,
}

impl MovementQuery {
    fn filter(&self) -> Result<MovementFilter, LedgerError> {
        Ok(MovementFilter {
            date_from: self.date_from,
            date_to: self.date_to,
            status: self.status.as_deref().map(str::parse).transpose()?,
            movement_type: self.movement_type.as_deref().map(str::parse).transpose()?,
            value_min: self.value_min,
            value_max: self.value_max,
        })
    }

    fn page(&self) -> PageRequest {
        let default = PageRequest::default();
        PageRequest::new(
            self.limit.unwrap_or(default.limit),
            self.offset.unwrap_or(default.offset),
        )
    }

    fn requested_accounts(&self) -> Result<Option<BTreeSet<AccountId>>, String> {
        let Some(raw) = self.account_ids.as_deref() else {
            return Ok(None);
        };
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<AccountId>()
                    .map_err(|_| format!("invalid account id '{s}'"))
            })
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Some)
    }
}

/// Response for a movement.
#[derive(Debug, Serialize)]
pub struct MovementResponse {
    /// Movement ID.
    pub id: Uuid,
    /// Owning account.
    pub account_id: Uuid,
    /// Business date.
    pub movement_date: NaiveDate,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Direction: entry or exit.
    #[serde(rename = "type")]
    pub movement_type: &'static str,
    /// Inflow amount.
    pub entry_amount: String,
    /// Outflow amount.
    pub exit_amount: String,
    /// Signed amount.
    pub amount: String,
    /// Lifecycle status.
    pub status: &'static str,
    /// Balance after this movement.
    pub running_balance: String,
    /// Description.
    pub description: String,
    /// Notes.
    pub notes: Option<String>,
}

impl From<Movement> for MovementResponse {
    fn from(m: Movement) -> Self {
        Self {
            id: m.id.into_inner(),
            account_id: m.account_id.into_inner(),
            movement_date: m.movement_date,
            created_at: m.created_at,
            movement_type: m.movement_type().as_str(),
            entry_amount: format_money(m.entry_amount),
            exit_amount: format_money(m.exit_amount),
            amount: format_money(m.signed_amount()),
            status: m.status.as_str(),
            running_balance: format_money(m.running_balance),
            description: m.description,
            notes: m.notes,
        }
    }
}

fn page_response(page: Page<Movement>, request: PageRequest) -> Response {
    let total = page.total;
    let movements: Vec<MovementResponse> = page.rows.into_iter().map(Into::into).collect();
    (
        StatusCode::OK,
        Json(json!({
            "movements": movements,
            "pagination": {
                "total": total,
                "limit": request.limit,
                "offset": request.offset
            }
        })),
    )
        .into_response()
}

/// POST `/accounts/{account_id}/movements` - Record a movement.
async fn create_movement<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<CreateMovementRequest>,
) -> Response {
    let (signed_amount, status) = match (payload.signed_amount(), payload.status()) {
        (Ok(amount), Ok(status)) => (amount, status),
        (Err(e), _) | (_, Err(e)) => return ledger_error_response(e),
    };

    let new = NewMovement {
        account_id: AccountId::from(account_id),
        movement_date: payload.movement_date,
        signed_amount,
        status,
        description: payload.description.unwrap_or_default(),
        notes: payload.notes,
    };

    match state.engine.insert_movement(new).await {
        Ok(outcome) => {
            let chain_stale = outcome.chain_stale();
            (
                StatusCode::CREATED,
                Json(json!({
                    "movement": MovementResponse::from(outcome.movement),
                    "backdated": outcome.backdated,
                    "chain_repaired": outcome.chain_repaired,
                    "chain_stale": chain_stale
                })),
            )
                .into_response()
        }
        Err(e) => ledger_error_response(e),
    }
}

/// PATCH `/movements/{movement_id}/status` - Change a movement's status.
async fn update_status<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(movement_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Response {
    let status = match payload.status.parse::<MovementStatus>() {
        Ok(status) => status,
        Err(e) => return ledger_error_response(e),
    };

    match state
        .engine
        .update_movement_status(movement_id.into(), status)
        .await
    {
        Ok(change) => (
            StatusCode::OK,
            Json(json!({
                "movement": MovementResponse::from(change.movement),
                "recalculation": RecalcResponse::from(change.recalc)
            })),
        )
            .into_response(),
        Err(e) => ledger_error_response(e),
    }
}

/// PATCH `/movements/{movement_id}/date` - Move a movement to another date.
async fn update_date<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(movement_id): Path<Uuid>,
    Json(payload): Json<UpdateDateRequest>,
) -> Response {
    match state
        .engine
        .reschedule_movement(movement_id.into(), payload.movement_date)
        .await
    {
        Ok(change) => (
            StatusCode::OK,
            Json(json!({
                "movement": MovementResponse::from(change.movement),
                "recalculation": RecalcResponse::from(change.recalc)
            })),
        )
            .into_response(),
        Err(e) => ledger_error_response(e),
    }
}

/// GET `/accounts/{account_id}/movements` - One account's movements in canonical order.
async fn list_account_movements<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(account_id): Path<Uuid>,
    Query(query): Query<MovementQuery>,
) -> Response {
    let filter = match query.filter() {
        Ok(filter) => filter,
        Err(e) => return ledger_error_response(e),
    };
    let page = query.page();

    match state
        .engine
        .query_account_movements(account_id.into(), &filter, page)
        .await
    {
        Ok(rows) => page_response(rows, page),
        Err(e) => ledger_error_response(e),
    }
}

/// GET `/tenants/{tenant_id}/movements` - Movements across a tenant's accounts.
///
/// `account_ids` narrows the listing; ids outside the tenant are ignored.
async fn list_tenant_movements<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<MovementQuery>,
) -> Response {
    let filter = match query.filter() {
        Ok(filter) => filter,
        Err(e) => return ledger_error_response(e),
    };
    let requested = match query.requested_accounts() {
        Ok(requested) => requested,
        Err(message) => return bad_request(message),
    };
    let page = query.page();

    let tenant_id = TenantId::from(tenant_id);
    let tenant_accounts = match state.engine.store().list_account_ids(tenant_id).await {
        Ok(ids) => ids,
        Err(e) => return ledger_error_response(e),
    };
    let scope: BTreeSet<AccountId> = tenant_accounts
        .into_iter()
        .filter(|id| requested.as_ref().is_none_or(|r| r.contains(id)))
        .collect();

    info!(
        tenant_id = %tenant_id,
        accounts = scope.len(),
        "Listing tenant movements"
    );

    match state.engine.query_movements(&scope, &filter, Some(page)).await {
        Ok(rows) => page_response(rows, page),
        Err(e) => ledger_error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use rstest::rstest;
    use saldo_core::ledger::EngineSettings;
    use serde_json::json;
    use uuid::Uuid;

    use super::super::test_support::TestApp;

    fn balances(body: &serde_json::Value) -> Vec<String> {
        body["movements"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["running_balance"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_create_movement_returns_created() {
        let app = TestApp::new();
        let account = app.open_account("Checking").await;

        let (status, body) = app
            .post(
                &format!("/api/v1/accounts/{account}/movements"),
                Some(json!({
                    "movement_date": "2026-01-01",
                    "amount": "100",
                    "description": "Opening deposit"
                })),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["movement"]["type"], "entry");
        assert_eq!(body["movement"]["status"], "pending");
        assert_eq!(body["movement"]["entry_amount"], "100.00");
        assert_eq!(body["movement"]["exit_amount"], "0.00");
        assert_eq!(body["movement"]["running_balance"], "100.00");
        assert_eq!(body["backdated"], false);
        assert_eq!(body["chain_stale"], false);
    }

    #[tokio::test]
    async fn test_create_movement_from_exit_amount() {
        let app = TestApp::new();
        let account = app.open_account("Checking").await;

        let (status, body) = app
            .post(
                &format!("/api/v1/accounts/{account}/movements"),
                Some(json!({ "movement_date": "2026-01-03", "exit_amount": "40.5" })),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["movement"]["type"], "exit");
        assert_eq!(body["movement"]["amount"], "-40.50");
        assert_eq!(body["movement"]["running_balance"], "-40.50");
    }

    #[rstest]
    #[case::missing_amount(json!({ "movement_date": "2026-01-01" }))]
    #[case::zero_amount(json!({ "movement_date": "2026-01-01", "amount": "0" }))]
    #[case::too_precise(json!({ "movement_date": "2026-01-01", "amount": "1.005" }))]
    #[case::both_sides(json!({ "movement_date": "2026-01-01", "entry_amount": "1", "exit_amount": "1" }))]
    #[case::mixed_forms(json!({ "movement_date": "2026-01-01", "amount": "1", "entry_amount": "1" }))]
    #[case::oversized(json!({ "movement_date": "2026-01-01", "amount": "50000000000000000000000000000" }))]
    #[case::at_column_limit(json!({ "movement_date": "2026-01-01", "exit_amount": "100000000000000000" }))]
    #[case::unknown_status(json!({ "movement_date": "2026-01-01", "amount": "1", "status": "void" }))]
    #[tokio::test]
    async fn test_create_movement_rejects_bad_input(#[case] payload: serde_json::Value) {
        let app = TestApp::new();
        let account = app.open_account("Checking").await;

        let (status, body) = app
            .post(&format!("/api/v1/accounts/{account}/movements"), Some(payload))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert!(app.store.movements_of(account).await.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_oversized_amounts_are_rejected() {
        let app = TestApp::new();
        let account = app.open_account("Checking").await;
        let uri = format!("/api/v1/accounts/{account}/movements");
        let payload = json!({ "movement_date": "2026-01-01", "amount": "50000000000000000000000000000" });

        for _ in 0..2 {
            let (status, body) = app.post(&uri, Some(payload.clone())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "validation_error");
        }

        app.record(account, "2026-01-01", "99999999999999999.99").await;
        let (status, body) = app.get(&uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(balances(&body), vec!["99999999999999999.99"]);
    }

    #[tokio::test]
    async fn test_create_movement_unknown_account() {
        let app = TestApp::new();

        let (status, body) = app
            .post(
                &format!("/api/v1/accounts/{}/movements", Uuid::new_v4()),
                Some(json!({ "movement_date": "2026-01-01", "amount": "5" })),
            )
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "account_not_found");
    }

    #[tokio::test]
    async fn test_backdated_insert_is_repaired() {
        let app = TestApp::new();
        let account = app.open_account("Checking").await;
        app.record(account, "2026-01-01", "100").await;
        app.record(account, "2026-01-03", "-40").await;

        let (status, body) = app
            .post(
                &format!("/api/v1/accounts/{account}/movements"),
                Some(json!({ "movement_date": "2026-01-02", "amount": "10", "status": "settled" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["backdated"], true);
        assert_eq!(body["chain_repaired"], true);
        assert_eq!(body["movement"]["running_balance"], "110.00");

        let (status, body) = app
            .get(&format!("/api/v1/accounts/{account}/movements"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(balances(&body), vec!["100.00", "110.00", "70.00"]);
        assert_eq!(body["pagination"]["total"], 3);
    }

    #[tokio::test]
    async fn test_backdated_insert_without_repair_is_stale() {
        let app = TestApp::with_settings(EngineSettings {
            repair_on_backdated_insert: false,
            ..EngineSettings::default()
        });
        let account = app.open_account("Checking").await;
        app.record(account, "2026-01-03", "-40").await;

        let (_, body) = app
            .post(
                &format!("/api/v1/accounts/{account}/movements"),
                Some(json!({ "movement_date": "2026-01-01", "amount": "100" })),
            )
            .await;

        assert_eq!(body["backdated"], true);
        assert_eq!(body["chain_stale"], true);
    }

    #[tokio::test]
    async fn test_cancel_excludes_movement() {
        let app = TestApp::new();
        let account = app.open_account("Checking").await;
        app.record(account, "2026-01-01", "100").await;
        let jan3 = app.record(account, "2026-01-03", "-40").await;
        app.record(account, "2026-01-02", "10").await;

        let (status, body) = app
            .patch(
                &format!("/api/v1/movements/{jan3}/status"),
                json!({ "status": "cancelled" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["movement"]["status"], "cancelled");
        assert_eq!(body["recalculation"]["final_balance"], "110.00");

        let (status, body) = app
            .patch(
                &format!("/api/v1/movements/{jan3}/status"),
                json!({ "status": "settled" }),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid_status_transition");

        let (_, body) = app
            .get(&format!("/api/v1/accounts/{account}/movements?status=settled"))
            .await;
        assert_eq!(balances(&body), vec!["100.00", "110.00"]);
    }

    #[tokio::test]
    async fn test_reschedule_reorders_chain() {
        let app = TestApp::new();
        let account = app.open_account("Checking").await;
        let first = app.record(account, "2026-01-01", "100").await;
        app.record(account, "2026-01-02", "-40").await;

        let (status, body) = app
            .patch(
                &format!("/api/v1/movements/{first}/date"),
                json!({ "movement_date": "2026-01-05" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["movement"]["movement_date"], "2026-01-05");
        assert_eq!(body["recalculation"]["updated_count"], 2);

        let (_, body) = app
            .get(&format!("/api/v1/accounts/{account}/movements"))
            .await;
        assert_eq!(balances(&body), vec!["-40.00", "60.00"]);
    }

    #[tokio::test]
    async fn test_update_unknown_movement() {
        let app = TestApp::new();

        let (status, body) = app
            .patch(
                &format!("/api/v1/movements/{}/status", Uuid::new_v4()),
                json!({ "status": "settled" }),
            )
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "movement_not_found");
    }

    #[tokio::test]
    async fn test_list_filters_and_pagination() {
        let app = TestApp::new();
        let account = app.open_account("Checking").await;
        for (day, amount) in [(1, "10"), (2, "-20"), (3, "30"), (4, "-40")] {
            app.record(account, &format!("2026-01-0{day}"), amount).await;
        }

        let (_, body) = app
            .get(&format!("/api/v1/accounts/{account}/movements?limit=2&offset=1"))
            .await;
        assert_eq!(body["pagination"]["total"], 4);
        assert_eq!(balances(&body), vec!["-10.00", "20.00"]);

        let (_, body) = app
            .get(&format!(
                "/api/v1/accounts/{account}/movements?type=exit&value_min=30"
            ))
            .await;
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["movements"][0]["amount"], "-40.00");

        let (_, body) = app
            .get(&format!(
                "/api/v1/accounts/{account}/movements?date_from=2026-01-02&date_to=2026-01-03"
            ))
            .await;
        assert_eq!(body["pagination"]["total"], 2);
    }

    #[rstest]
    #[case::reversed_dates("date_from=2026-02-01&date_to=2026-01-01")]
    #[case::negative_limit("limit=-1")]
    #[case::negative_offset("offset=-5")]
    #[case::oversized_limit("limit=501")]
    #[case::inverted_bounds("value_min=10&value_max=5")]
    #[case::unknown_type("type=sideways")]
    #[tokio::test]
    async fn test_list_rejects_malformed_query(#[case] query: &str) {
        let app = TestApp::new();
        let account = app.open_account("Checking").await;

        let (status, body) = app
            .get(&format!("/api/v1/accounts/{account}/movements?{query}"))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_tenant_listing_is_scoped_to_tenant() {
        let app = TestApp::new();
        let a = app.open_account("A").await;
        let b = app.open_account("B").await;
        let foreign = app.open_account_for(saldo_shared::types::TenantId::new(), "Other").await;
        app.record(a, "2026-01-02", "10").await;
        app.record(b, "2026-01-01", "20").await;
        app.record(foreign, "2026-01-01", "99").await;
        let tenant = app.tenant_id;

        let (status, body) = app
            .get(&format!("/api/v1/tenants/{tenant}/movements"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["total"], 2);
        assert_eq!(body["movements"][0]["account_id"], b.to_string());

        let (_, body) = app
            .get(&format!(
                "/api/v1/tenants/{tenant}/movements?account_ids={a},{foreign}"
            ))
            .await;
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["movements"][0]["account_id"], a.to_string());

        let (status, body) = app
            .get(&format!("/api/v1/tenants/{tenant}/movements?account_ids={foreign}"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["total"], 0);
        assert!(body["movements"].as_array().unwrap().is_empty());

        let (status, _) = app
            .get(&format!("/api/v1/tenants/{tenant}/movements?account_ids=nope"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

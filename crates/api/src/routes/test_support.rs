//! Router harness over the in-memory store.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use saldo_core::ledger::{Account, EngineSettings, LedgerEngine, MemoryLedgerStore};
use saldo_shared::types::{AccountId, TenantId};
use serde_json::Value;
use tower::ServiceExt;

use crate::{AppState, create_router};

pub(crate) struct TestApp {
    pub store: MemoryLedgerStore,
    pub tenant_id: TenantId,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        let store = MemoryLedgerStore::new();
        let engine = LedgerEngine::with_settings(store.clone(), settings);
        Self {
            store,
            tenant_id: TenantId::new(),
            router: create_router(AppState::new(engine)),
        }
    }

    pub async fn open_account(&self, label: &str) -> AccountId {
        self.open_account_for(self.tenant_id, label).await
    }

    pub async fn open_account_for(&self, tenant_id: TenantId, label: &str) -> AccountId {
        let id = AccountId::new();
        self.store
            .insert_account(Account {
                id,
                tenant_id,
                label: label.to_string(),
                cached_balance: Decimal::ZERO,
            })
            .await;
        id
    }

    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send("POST", uri, body).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("PATCH", uri, Some(body)).await
    }

    /// Records a movement and returns its id.
    pub async fn record(&self, account_id: AccountId, date: &str, amount: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/api/v1/accounts/{account_id}/movements"),
                Some(serde_json::json!({
                    "movement_date": date,
                    "amount": amount,
                    "status": "settled"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["movement"]["id"].as_str().unwrap().to_string()
    }
}

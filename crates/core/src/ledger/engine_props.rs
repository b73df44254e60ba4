//! Property-based tests for LedgerEngine.
//!
//! - Prefix-sum invariant after recalculation
//! - Idempotence of recalculation
//! - Cancellation exclusion
//! - Cached balance equals the last running balance

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use saldo_shared::types::{AccountId, TenantId};

use super::account::Account;
use super::balance::compute_running_balances;
use super::engine::{EngineSettings, LedgerEngine};
use super::memory::MemoryLedgerStore;
use super::movement::{MovementStatus, NewMovement};

/// Strategy to generate non-zero signed amounts (-1,000.00 to 1,000.00).
fn signed_amount() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        (1i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2)),
        (1i64..100_000i64).prop_map(|cents| Decimal::new(-cents, 2)),
    ]
}

/// Strategy to generate movement statuses, cancelled included.
fn status_strategy() -> impl Strategy<Value = MovementStatus> {
    prop_oneof![
        Just(MovementStatus::Pending),
        Just(MovementStatus::Settled),
        Just(MovementStatus::Transferred),
        Just(MovementStatus::Cancelled),
    ]
}

/// Strategy to generate (day offset, amount, status) triples in arbitrary order.
fn movements_strategy() -> impl Strategy<Value = Vec<(u32, Decimal, MovementStatus)>> {
    prop::collection::vec((0u32..20, signed_amount(), status_strategy()), 0..25)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Inserts the movements in the given order and returns the account.
async fn seed(
    engine: &LedgerEngine<MemoryLedgerStore>,
    movements: &[(u32, Decimal, MovementStatus)],
) -> AccountId {
    let account_id = AccountId::new();
    engine
        .store()
        .insert_account(Account {
            id: account_id,
            tenant_id: TenantId::new(),
            label: "prop".to_string(),
            cached_balance: Decimal::ZERO,
        })
        .await;

    let base = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    for (offset, amount, status) in movements {
        engine
            .insert_movement(NewMovement {
                account_id,
                movement_date: base + chrono::Days::new(u64::from(*offset)),
                signed_amount: *amount,
                status: *status,
                description: String::new(),
                notes: None,
            })
            .await
            .unwrap();
    }
    account_id
}

fn engine(repair_on_backdated_insert: bool) -> LedgerEngine<MemoryLedgerStore> {
    LedgerEngine::with_settings(
        MemoryLedgerStore::new(),
        EngineSettings {
            repair_on_backdated_insert,
            ..EngineSettings::default()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After recalculation every stored balance is the canonical prefix sum,
    /// and the cached balance equals the last one (or zero).
    #[test]
    fn prop_recalculation_restores_prefix_sums(movements in movements_strategy()) {
        runtime().block_on(async {
            let engine = engine(false);
            let account_id = seed(&engine, &movements).await;

            let result = engine.recalculate_account(account_id).await.unwrap();

            let chain: Vec<_> = engine
                .store()
                .movements_of(account_id)
                .await
                .into_iter()
                .filter(|m| m.counts_toward_balance())
                .collect();
            let amounts: Vec<Decimal> = chain.iter().map(|m| m.signed_amount()).collect();
            let expected = compute_running_balances(Decimal::ZERO, &amounts);
            let stored: Vec<Decimal> = chain.iter().map(|m| m.running_balance).collect();
            assert_eq!(stored, expected);

            let last = expected.last().copied().unwrap_or(Decimal::ZERO);
            assert_eq!(result.final_balance, last);
            let account = engine.store().account(account_id).await.unwrap();
            assert_eq!(account.cached_balance, last);
        });
    }

    /// A second consecutive recalculation updates zero rows.
    #[test]
    fn prop_recalculation_is_idempotent(movements in movements_strategy()) {
        runtime().block_on(async {
            let engine = engine(false);
            let account_id = seed(&engine, &movements).await;

            let first = engine.recalculate_account(account_id).await.unwrap();
            let second = engine.recalculate_account(account_id).await.unwrap();

            assert_eq!(second.updated_count, 0);
            assert_eq!(second.final_balance, first.final_balance);
        });
    }

    /// The final balance is the sum of non-cancelled amounts only.
    #[test]
    fn prop_cancelled_movements_never_count(movements in movements_strategy()) {
        runtime().block_on(async {
            let engine = engine(false);
            let account_id = seed(&engine, &movements).await;

            let expected: Decimal = movements
                .iter()
                .filter(|(_, _, status)| status.counts_toward_balance())
                .map(|(_, amount, _)| *amount)
                .sum();

            let result = engine.recalculate_account(account_id).await.unwrap();
            assert_eq!(result.final_balance, expected);
            assert_eq!(engine.sync_current_balance(account_id).await.unwrap(), expected);
        });
    }

    /// Repairing on every backdated insert leaves nothing for a later recalculation.
    #[test]
    fn prop_repairing_inserts_keep_chain_consistent(movements in movements_strategy()) {
        runtime().block_on(async {
            let engine = engine(true);
            let account_id = seed(&engine, &movements).await;

            let audit = engine.audit_account(account_id).await.unwrap();
            assert_eq!(audit.drifted_count, 0);
            assert!(audit.cached_balance_matches);
        });
    }
}

//! Single-account recalculation, current-balance sync and audits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use saldo_shared::types::AccountId;
use tracing::{debug, info, warn};

use super::balance::{current_balance, plan_chain};
use super::engine::{LedgerEngine, finish};
use super::error::LedgerError;
use super::store::{LedgerStore, LedgerTx};

/// Outcome of recalculating one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalcResult {
    /// Recalculated account.
    pub account_id: AccountId,
    /// Movement rows whose running balance was rewritten.
    pub updated_count: usize,
    /// Balance after the last non-cancelled movement (zero if none).
    pub final_balance: Decimal,
    /// Non-cancelled movements in the chain.
    pub movement_count: usize,
}

/// What a recalculation would change, computed without writing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Audited account.
    pub account_id: AccountId,
    /// Non-cancelled movements in the chain.
    pub movement_count: usize,
    /// Movements whose stored running balance is wrong.
    pub drifted_count: usize,
    /// Balance the chain adds up to.
    pub computed_balance: Decimal,
    /// Balance currently cached on the account.
    pub cached_balance: Decimal,
    /// Whether the cached balance equals the computed one.
    pub cached_balance_matches: bool,
}

impl AuditReport {
    /// Returns true if neither the chain nor the cached balance needs repair.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.drifted_count == 0 && self.cached_balance_matches
    }
}

impl<S: LedgerStore> LedgerEngine<S> {
    /// Recomputes an account's running balances and cached balance.
    ///
    /// Only rows whose stored balance differs are written, so a second run
    /// updates nothing. A concurrent modification is retried with fresh data
    /// up to `consistency_retries` times. The whole attempt is bounded by
    /// `account_timeout`; on expiry the open transaction is dropped and rolled back.
    pub async fn recalculate_account(
        &self,
        account_id: AccountId,
    ) -> Result<RecalcResult, LedgerError> {
        let limit = self.settings.account_timeout;
        tokio::time::timeout(limit, self.recalculate_with_retry(account_id))
            .await
            .map_err(|_| LedgerError::Timeout {
                account_id,
                secs: limit.as_secs(),
            })?
    }

    async fn recalculate_with_retry(
        &self,
        account_id: AccountId,
    ) -> Result<RecalcResult, LedgerError> {
        let mut attempt = 0;
        loop {
            match self.recalculate_once(account_id).await {
                Err(err) if err.is_retryable() && attempt < self.settings.consistency_retries => {
                    attempt += 1;
                    warn!(
                        account_id = %account_id,
                        attempt,
                        error = %err,
                        "Retrying recalculation with fresh data"
                    );
                }
                outcome => return outcome,
            }
        }
    }

    async fn recalculate_once(&self, account_id: AccountId) -> Result<RecalcResult, LedgerError> {
        let mut tx = self.store.begin().await?;
        let outcome = recalculate_in_tx(&mut tx, account_id).await;
        let result = finish(tx, outcome).await?;

        info!(
            account_id = %account_id,
            updated = result.updated_count,
            movements = result.movement_count,
            final_balance = %result.final_balance,
            "Account recalculated"
        );
        Ok(result)
    }

    /// Writes the sum of the account's non-cancelled movements to its cached balance.
    ///
    /// Touches the account row only.
    pub async fn sync_current_balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        let mut tx = self.store.begin().await?;
        let outcome = sync_in_tx(&mut tx, account_id).await;
        let balance = finish(tx, outcome).await?;

        debug!(account_id = %account_id, balance = %balance, "Cached balance synchronized");
        Ok(balance)
    }

    /// Reports drift in an account's chain and cached balance without repairing it.
    pub async fn audit_account(&self, account_id: AccountId) -> Result<AuditReport, LedgerError> {
        let mut tx = self.store.begin().await?;
        let outcome = audit_in_tx(&mut tx, account_id).await;
        // Read-only: always roll back.
        if let Err(err) = tx.rollback().await {
            warn!(account_id = %account_id, error = %err, "Rollback failed after audit");
        }
        outcome
    }
}

/// Recalculates inside an open transaction. The caller commits.
pub(super) async fn recalculate_in_tx<X: LedgerTx>(
    tx: &mut X,
    account_id: AccountId,
) -> Result<RecalcResult, LedgerError> {
    let account = tx.lock_account(account_id).await?;
    let chain = tx.load_chain(account_id).await?;
    let plan = plan_chain(Decimal::ZERO, &chain);

    for correction in &plan.corrections {
        tx.update_running_balance(account_id, correction).await?;
    }
    if account.cached_balance != plan.final_balance {
        tx.set_cached_balance(account_id, plan.final_balance).await?;
    }

    Ok(RecalcResult {
        account_id,
        updated_count: plan.corrections.len(),
        final_balance: plan.final_balance,
        movement_count: plan.movement_count(),
    })
}

async fn sync_in_tx<X: LedgerTx>(tx: &mut X, account_id: AccountId) -> Result<Decimal, LedgerError> {
    tx.lock_account(account_id).await?;
    let chain = tx.load_chain(account_id).await?;
    let balance = current_balance(&chain);
    tx.set_cached_balance(account_id, balance).await?;
    Ok(balance)
}

async fn audit_in_tx<X: LedgerTx>(
    tx: &mut X,
    account_id: AccountId,
) -> Result<AuditReport, LedgerError> {
    let account = tx.lock_account(account_id).await?;
    let chain = tx.load_chain(account_id).await?;
    let plan = plan_chain(Decimal::ZERO, &chain);

    Ok(AuditReport {
        account_id,
        movement_count: plan.movement_count(),
        drifted_count: plan.corrections.len(),
        computed_balance: plan.final_balance,
        cached_balance: account.cached_balance,
        cached_balance_matches: account.cached_balance == plan.final_balance,
    })
}

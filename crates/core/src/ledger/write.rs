//! Write path: inserts, status transitions and date edits.
//!
//! Every write takes the account lock first, so it never interleaves with a
//! recalculation of the same account.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use saldo_shared::types::{AccountId, MovementId};
use tracing::{debug, info};

use super::engine::{LedgerEngine, finish};
use super::error::LedgerError;
use super::movement::{Movement, MovementAmount, MovementStatus, NewMovement, storage_timestamp};
use super::recalculate::{RecalcResult, recalculate_in_tx};
use super::store::{LedgerStore, LedgerTx};

/// Result of [`LedgerEngine::insert_movement`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    /// The stored movement, with its running balance as committed.
    pub movement: Movement,
    /// The movement sorts before the current tail of the chain.
    pub backdated: bool,
    /// The chain was recomputed in the insert transaction.
    pub chain_repaired: bool,
}

impl InsertOutcome {
    /// Returns true if later movements still carry stale balances.
    #[must_use]
    pub const fn chain_stale(&self) -> bool {
        self.backdated && !self.chain_repaired
    }
}

/// Result of a status change or date edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementChange {
    /// The movement after the change.
    pub movement: Movement,
    /// Recalculation committed together with the change.
    pub recalc: RecalcResult,
}

impl<S: LedgerStore> LedgerEngine<S> {
    /// Records a new movement.
    ///
    /// The running balance is derived from the movement's canonical predecessor.
    /// An append updates the cached balance incrementally; a backdated insert
    /// recomputes the chain in the same transaction when
    /// `repair_on_backdated_insert` is set and is otherwise left for a later
    /// recalculation.
    pub async fn insert_movement(&self, new: NewMovement) -> Result<InsertOutcome, LedgerError> {
        let amount = MovementAmount::from_signed(new.signed_amount)?;
        let account_id = new.account_id;

        let mut tx = self.store.begin().await?;
        let outcome = self.insert_in_tx(&mut tx, new, amount).await;
        let outcome = finish(tx, outcome).await?;

        if outcome.backdated {
            debug!(
                account_id = %account_id,
                movement_id = %outcome.movement.id,
                repaired = outcome.chain_repaired,
                "Backdated movement inserted"
            );
        }
        info!(
            account_id = %account_id,
            movement_id = %outcome.movement.id,
            amount = %amount.signed(),
            "Movement recorded"
        );
        Ok(outcome)
    }

    async fn insert_in_tx<X: LedgerTx>(
        &self,
        tx: &mut X,
        new: NewMovement,
        amount: MovementAmount,
    ) -> Result<InsertOutcome, LedgerError> {
        let account = tx.lock_account(new.account_id).await?;
        let chain = tx.load_chain(new.account_id).await?;

        let mut movement = Movement {
            id: MovementId::new(),
            account_id: new.account_id,
            movement_date: new.movement_date,
            created_at: storage_timestamp(),
            entry_amount: amount.entry(),
            exit_amount: amount.exit(),
            status: new.status,
            running_balance: Decimal::ZERO,
            description: new.description,
            notes: new.notes,
        };

        let key = movement.canonical_key();
        let opening = chain
            .iter()
            .rev()
            .find(|m| m.canonical_key() < key)
            .map_or(Decimal::ZERO, |m| m.running_balance);
        let counts = movement.counts_toward_balance();
        movement.running_balance = if counts { opening + amount.signed() } else { opening };

        let backdated = counts && chain.last().is_some_and(|last| last.canonical_key() > key);
        tx.insert_movement(&movement).await?;

        let mut chain_repaired = false;
        if backdated && self.settings.repair_on_backdated_insert {
            recalculate_in_tx(tx, account.id).await?;
            movement = reload(tx, movement.id).await?;
            chain_repaired = true;
        } else if counts {
            tx.set_cached_balance(account.id, account.cached_balance + amount.signed())
                .await?;
        }

        Ok(InsertOutcome {
            movement,
            backdated,
            chain_repaired,
        })
    }

    /// Moves a movement to a new status and recomputes its account in one transaction.
    ///
    /// `cancelled` is terminal. Setting the current status again changes nothing.
    pub async fn update_movement_status(
        &self,
        movement_id: MovementId,
        status: MovementStatus,
    ) -> Result<MovementChange, LedgerError> {
        let account_id = self.owning_account(movement_id).await?;

        let mut tx = self.store.begin().await?;
        let outcome = change_status_in_tx(&mut tx, account_id, movement_id, status).await;
        let change = finish(tx, outcome).await?;

        info!(
            account_id = %account_id,
            movement_id = %movement_id,
            status = %status,
            updated = change.recalc.updated_count,
            "Movement status changed"
        );
        Ok(change)
    }

    /// Changes a movement's date and recomputes its account in one transaction.
    ///
    /// Cancelled movements cannot be rescheduled.
    pub async fn reschedule_movement(
        &self,
        movement_id: MovementId,
        movement_date: NaiveDate,
    ) -> Result<MovementChange, LedgerError> {
        let account_id = self.owning_account(movement_id).await?;

        let mut tx = self.store.begin().await?;
        let outcome = reschedule_in_tx(&mut tx, account_id, movement_id, movement_date).await;
        let change = finish(tx, outcome).await?;

        info!(
            account_id = %account_id,
            movement_id = %movement_id,
            movement_date = %movement_date,
            updated = change.recalc.updated_count,
            "Movement rescheduled"
        );
        Ok(change)
    }

    async fn owning_account(&self, movement_id: MovementId) -> Result<AccountId, LedgerError> {
        self.store
            .find_movement(movement_id)
            .await?
            .map(|m| m.account_id)
            .ok_or(LedgerError::MovementNotFound(movement_id))
    }
}

async fn reload<X: LedgerTx>(tx: &mut X, movement_id: MovementId) -> Result<Movement, LedgerError> {
    tx.fetch_movement(movement_id)
        .await?
        .ok_or(LedgerError::MovementNotFound(movement_id))
}

async fn change_status_in_tx<X: LedgerTx>(
    tx: &mut X,
    account_id: AccountId,
    movement_id: MovementId,
    status: MovementStatus,
) -> Result<MovementChange, LedgerError> {
    tx.lock_account(account_id).await?;
    let mut movement = reload(tx, movement_id).await?;

    if movement.status != status {
        if movement.status.is_terminal() {
            return Err(LedgerError::InvalidStatusTransition {
                from: movement.status,
                to: status,
            });
        }
        movement.status = status;
        tx.update_movement(&movement).await?;
    }

    let recalc = recalculate_in_tx(tx, account_id).await?;
    let movement = reload(tx, movement_id).await?;
    Ok(MovementChange { movement, recalc })
}

async fn reschedule_in_tx<X: LedgerTx>(
    tx: &mut X,
    account_id: AccountId,
    movement_id: MovementId,
    movement_date: NaiveDate,
) -> Result<MovementChange, LedgerError> {
    tx.lock_account(account_id).await?;
    let mut movement = reload(tx, movement_id).await?;

    if !movement.counts_toward_balance() {
        return Err(LedgerError::MovementCancelled(movement_id));
    }
    if movement.movement_date != movement_date {
        movement.movement_date = movement_date;
        tx.update_movement(&movement).await?;
    }

    let recalc = recalculate_in_tx(tx, account_id).await?;
    let movement = reload(tx, movement_id).await?;
    Ok(MovementChange { movement, recalc })
}

//! Storage seam for the ledger engine.
//!
//! The engine owns transaction boundaries and ordering rules; a store only
//! persists and retrieves rows. `saldo-db` implements these traits over
//! Postgres and [`super::memory::MemoryLedgerStore`] implements them in memory.

use async_trait::async_trait;
use rust_decimal::Decimal;
use saldo_shared::types::{AccountId, MovementId, Page, PageRequest, TenantId};

use super::account::Account;
use super::balance::BalanceCorrection;
use super::error::LedgerError;
use super::filter::MovementFilter;
use super::movement::Movement;

/// Read access plus the ability to open a unit of work.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Transaction type produced by [`LedgerStore::begin`].
    type Tx: LedgerTx;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Tx, LedgerError>;

    /// Lists the ids of every account belonging to a tenant.
    async fn list_account_ids(&self, tenant_id: TenantId) -> Result<Vec<AccountId>, LedgerError>;

    /// Loads an account, failing with `AccountNotFound`.
    async fn get_account(&self, account_id: AccountId) -> Result<Account, LedgerError>;

    /// Looks up a single movement.
    async fn find_movement(&self, movement_id: MovementId)
    -> Result<Option<Movement>, LedgerError>;

    /// Returns matching movements of the given accounts in canonical order.
    ///
    /// Cancelled movements are included unless the filter excludes them. Without
    /// a page request every matching row is returned. Callers validate the
    /// filter and page beforehand.
    async fn query_movements(
        &self,
        account_ids: &[AccountId],
        filter: &MovementFilter,
        page: Option<PageRequest>,
    ) -> Result<Page<Movement>, LedgerError>;
}

/// A unit of work. Dropping it without [`LedgerTx::commit`] discards every change.
#[async_trait]
pub trait LedgerTx: Send {
    /// Takes the exclusive per-account lock for the rest of the transaction.
    async fn lock_account(&mut self, account_id: AccountId) -> Result<Account, LedgerError>;

    /// Loads the account's non-cancelled movements in canonical order.
    async fn load_chain(&mut self, account_id: AccountId) -> Result<Vec<Movement>, LedgerError>;

    /// Reads one movement inside the transaction.
    async fn fetch_movement(
        &mut self,
        movement_id: MovementId,
    ) -> Result<Option<Movement>, LedgerError>;

    /// Inserts a new movement row as given.
    async fn insert_movement(&mut self, movement: &Movement) -> Result<(), LedgerError>;

    /// Rewrites one running balance, guarded by the value read earlier.
    ///
    /// Fails with `ConcurrentModification` when the stored value no longer
    /// equals `correction.stored` or the row is gone.
    async fn update_running_balance(
        &mut self,
        account_id: AccountId,
        correction: &BalanceCorrection,
    ) -> Result<(), LedgerError>;

    /// Persists a movement's status and date. Other fields are left untouched.
    async fn update_movement(&mut self, movement: &Movement) -> Result<(), LedgerError>;

    /// Writes the account's cached balance.
    async fn set_cached_balance(
        &mut self,
        account_id: AccountId,
        balance: Decimal,
    ) -> Result<(), LedgerError>;

    /// Makes every change visible.
    async fn commit(self) -> Result<(), LedgerError>;

    /// Discards every change.
    async fn rollback(self) -> Result<(), LedgerError>;
}

//! In-memory ledger store.
//!
//! Backs the engine in tests and local tooling. A transaction holds the store
//! lock for its whole lifetime and works on a private copy of the state, so
//! transactions are fully serialized and an uncommitted transaction is never
//! visible. Faults can be injected per account to exercise failure paths.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use saldo_shared::types::{AccountId, MovementId, Page, PageRequest, TenantId};
use tokio::sync::OwnedMutexGuard;

use super::account::Account;
use super::balance::BalanceCorrection;
use super::error::LedgerError;
use super::filter::MovementFilter;
use super::movement::{Movement, sort_canonical};
use super::store::{LedgerStore, LedgerTx};

/// Failure modes that can be injected for a single account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageFault {
    /// Loading the account's chain fails with a storage error.
    LoadChain,
    /// Every running-balance write fails with a storage error.
    WriteBalance,
    /// The next running-balance write reports a concurrent modification.
    ConflictOnce,
    /// Committing a transaction that touched the account fails.
    Commit,
    /// Locking the account never completes.
    Stall,
}

type FaultMap = Arc<Mutex<HashMap<AccountId, HashSet<StorageFault>>>>;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: BTreeMap<AccountId, Account>,
    movements: BTreeMap<MovementId, Movement>,
}

/// Ledger store kept entirely in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<tokio::sync::Mutex<MemoryState>>,
    faults: FaultMap,
    balance_writes: Arc<AtomicU64>,
    cached_balance_writes: Arc<AtomicU64>,
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account (stands in for the external account registry).
    pub async fn insert_account(&self, account: Account) {
        self.state.lock().await.accounts.insert(account.id, account);
    }

    /// Stores a movement exactly as given, bypassing the engine.
    ///
    /// Used to stage drifted or out-of-order data.
    pub async fn seed_movement(&self, movement: Movement) {
        self.state.lock().await.movements.insert(movement.id, movement);
    }

    /// Returns a copy of an account.
    pub async fn account(&self, account_id: AccountId) -> Option<Account> {
        self.state.lock().await.accounts.get(&account_id).cloned()
    }

    /// Returns every movement of an account, cancelled ones included, in canonical order.
    pub async fn movements_of(&self, account_id: AccountId) -> Vec<Movement> {
        let state = self.state.lock().await;
        let mut movements: Vec<Movement> = state
            .movements
            .values()
            .filter(|m| m.account_id == account_id)
            .cloned()
            .collect();
        sort_canonical(&mut movements);
        movements
    }

    /// Arms a fault for an account.
    pub fn inject_fault(&self, account_id: AccountId, fault: StorageFault) {
        lock_faults(&self.faults)
            .entry(account_id)
            .or_default()
            .insert(fault);
    }

    /// Disarms every fault of an account.
    pub fn clear_faults(&self, account_id: AccountId) {
        lock_faults(&self.faults).remove(&account_id);
    }

    /// Number of committed running-balance writes since the store was created.
    #[must_use]
    pub fn balance_writes(&self) -> u64 {
        self.balance_writes.load(Ordering::SeqCst)
    }

    /// Number of committed cached-balance writes since the store was created.
    #[must_use]
    pub fn cached_balance_writes(&self) -> u64 {
        self.cached_balance_writes.load(Ordering::SeqCst)
    }
}

fn lock_faults(
    faults: &FaultMap,
) -> std::sync::MutexGuard<'_, HashMap<AccountId, HashSet<StorageFault>>> {
    faults.lock().unwrap_or_else(PoisonError::into_inner)
}

fn has_fault(faults: &FaultMap, account_id: AccountId, fault: StorageFault) -> bool {
    lock_faults(faults)
        .get(&account_id)
        .is_some_and(|set| set.contains(&fault))
}

fn take_fault(faults: &FaultMap, account_id: AccountId, fault: StorageFault) -> bool {
    lock_faults(faults)
        .get_mut(&account_id)
        .is_some_and(|set| set.remove(&fault))
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx, LedgerError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTransaction {
            guard,
            working,
            touched: HashSet::new(),
            pending_writes: 0,
            pending_cached_writes: 0,
            faults: Arc::clone(&self.faults),
            balance_writes: Arc::clone(&self.balance_writes),
            cached_balance_writes: Arc::clone(&self.cached_balance_writes),
        })
    }

    async fn list_account_ids(&self, tenant_id: TenantId) -> Result<Vec<AccountId>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .filter(|a| a.tenant_id == tenant_id)
            .map(|a| a.id)
            .collect())
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.state
            .lock()
            .await
            .accounts
            .get(&account_id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    async fn find_movement(
        &self,
        movement_id: MovementId,
    ) -> Result<Option<Movement>, LedgerError> {
        Ok(self.state.lock().await.movements.get(&movement_id).cloned())
    }

    async fn query_movements(
        &self,
        account_ids: &[AccountId],
        filter: &MovementFilter,
        page: Option<PageRequest>,
    ) -> Result<Page<Movement>, LedgerError> {
        let wanted: HashSet<AccountId> = account_ids.iter().copied().collect();
        let state = self.state.lock().await;
        let mut rows: Vec<Movement> = state
            .movements
            .values()
            .filter(|m| wanted.contains(&m.account_id) && filter.matches(m))
            .cloned()
            .collect();
        drop(state);

        sort_canonical(&mut rows);
        let total = rows.len() as u64;
        let rows = match page {
            Some(page) => rows
                .into_iter()
                .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
                .collect(),
            None => rows,
        };
        Ok(Page::new(rows, total))
    }
}

/// A serialized unit of work over [`MemoryLedgerStore`].
#[derive(Debug)]
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    touched: HashSet<AccountId>,
    pending_writes: u64,
    pending_cached_writes: u64,
    faults: FaultMap,
    balance_writes: Arc<AtomicU64>,
    cached_balance_writes: Arc<AtomicU64>,
}

#[async_trait]
impl LedgerTx for MemoryTransaction {
    async fn lock_account(&mut self, account_id: AccountId) -> Result<Account, LedgerError> {
        if has_fault(&self.faults, account_id, StorageFault::Stall) {
            tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
        }
        self.touched.insert(account_id);
        self.working
            .accounts
            .get(&account_id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    async fn load_chain(&mut self, account_id: AccountId) -> Result<Vec<Movement>, LedgerError> {
        if has_fault(&self.faults, account_id, StorageFault::LoadChain) {
            return Err(LedgerError::Storage(format!(
                "injected failure loading movements of account {account_id}"
            )));
        }
        let mut chain: Vec<Movement> = self
            .working
            .movements
            .values()
            .filter(|m| m.account_id == account_id && m.counts_toward_balance())
            .cloned()
            .collect();
        sort_canonical(&mut chain);
        Ok(chain)
    }

    async fn fetch_movement(
        &mut self,
        movement_id: MovementId,
    ) -> Result<Option<Movement>, LedgerError> {
        Ok(self.working.movements.get(&movement_id).cloned())
    }

    async fn insert_movement(&mut self, movement: &Movement) -> Result<(), LedgerError> {
        if !self.working.accounts.contains_key(&movement.account_id) {
            return Err(LedgerError::AccountNotFound(movement.account_id));
        }
        if self.working.movements.contains_key(&movement.id) {
            return Err(LedgerError::Storage(format!(
                "duplicate movement id {}",
                movement.id
            )));
        }
        self.touched.insert(movement.account_id);
        self.working.movements.insert(movement.id, movement.clone());
        Ok(())
    }

    async fn update_running_balance(
        &mut self,
        account_id: AccountId,
        correction: &BalanceCorrection,
    ) -> Result<(), LedgerError> {
        let conflict = LedgerError::ConcurrentModification {
            account_id,
            movement_id: correction.movement_id,
        };
        if take_fault(&self.faults, account_id, StorageFault::ConflictOnce) {
            return Err(conflict);
        }
        if has_fault(&self.faults, account_id, StorageFault::WriteBalance) {
            return Err(LedgerError::Storage(format!(
                "injected failure writing balance of movement {}",
                correction.movement_id
            )));
        }

        let row = self
            .working
            .movements
            .get_mut(&correction.movement_id)
            .filter(|m| m.account_id == account_id && m.running_balance == correction.stored)
            .ok_or(conflict)?;
        row.running_balance = correction.computed;
        self.pending_writes += 1;
        Ok(())
    }

    async fn update_movement(&mut self, movement: &Movement) -> Result<(), LedgerError> {
        let row = self
            .working
            .movements
            .get_mut(&movement.id)
            .ok_or(LedgerError::MovementNotFound(movement.id))?;
        row.status = movement.status;
        row.movement_date = movement.movement_date;
        self.touched.insert(movement.account_id);
        Ok(())
    }

    async fn set_cached_balance(
        &mut self,
        account_id: AccountId,
        balance: Decimal,
    ) -> Result<(), LedgerError> {
        let account = self
            .working
            .accounts
            .get_mut(&account_id)
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        account.cached_balance = balance;
        self.pending_cached_writes += 1;
        Ok(())
    }

    async fn commit(self) -> Result<(), LedgerError> {
        let Self {
            mut guard,
            working,
            touched,
            pending_writes,
            pending_cached_writes,
            faults,
            balance_writes,
            cached_balance_writes,
        } = self;

        if let Some(account_id) = touched
            .iter()
            .find(|id| has_fault(&faults, **id, StorageFault::Commit))
        {
            return Err(LedgerError::Storage(format!(
                "injected commit failure for account {account_id}"
            )));
        }

        *guard = working;
        balance_writes.fetch_add(pending_writes, Ordering::SeqCst);
        cached_balance_writes.fetch_add(pending_cached_writes, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        Ok(())
    }
}

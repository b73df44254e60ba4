//! Running-balance ledger.
//!
//! This module implements the ledger consistency engine:
//! - Movements, statuses and canonical ordering
//! - The pure prefix-sum over an ordered chain
//! - The store seam (`LedgerStore` / `LedgerTx`) and an in-memory store
//! - `LedgerEngine`: write path, single-account and fleet recalculation,
//!   current-balance synchronization, audits and filtered queries

pub mod account;
pub mod balance;
pub mod engine;
pub mod error;
pub mod filter;
pub mod fleet;
pub mod memory;
pub mod movement;
pub mod query;
pub mod recalculate;
pub mod store;
pub mod write;

#[cfg(test)]
mod engine_props;

pub use account::Account;
pub use balance::{BalanceCorrection, ChainPlan, compute_running_balances, current_balance, plan_chain};
pub use engine::{EngineSettings, LedgerEngine};
pub use error::LedgerError;
pub use filter::MovementFilter;
pub use fleet::{AccountRecalcOutcome, AccountRecalcStatus, FleetReport};
pub use memory::{MemoryLedgerStore, MemoryTransaction, StorageFault};
pub use movement::{
    CanonicalKey, Movement, MovementAmount, MovementStatus, MovementType, NewMovement,
    sort_canonical,
};
pub use recalculate::{AuditReport, RecalcResult};
pub use store::{LedgerStore, LedgerTx};
pub use write::{InsertOutcome, MovementChange};

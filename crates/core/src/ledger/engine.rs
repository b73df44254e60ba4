//! The ledger engine: owns transaction boundaries over a [`LedgerStore`].
//!
//! Operations are split across sibling modules by concern:
//! - `write` - inserts, status changes and date edits
//! - `recalculate` - single-account recalculation, balance sync and audits
//! - `fleet` - tenant-wide recalculation with per-account isolation
//! - `query` - filtered retrieval

use std::time::Duration;

use saldo_shared::LedgerConfig;
use tracing::warn;

use super::error::LedgerError;
use super::store::{LedgerStore, LedgerTx};

/// Runtime knobs for [`LedgerEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Accounts recalculated at once by a fleet run.
    pub fleet_concurrency: usize,
    /// Upper bound on one account's recalculation.
    pub account_timeout: Duration,
    /// Extra attempts after a concurrent modification.
    pub consistency_retries: u32,
    /// Recompute the chain inside the insert transaction for backdated movements.
    pub repair_on_backdated_insert: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for EngineSettings {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            fleet_concurrency: config.fleet_concurrency.max(1),
            account_timeout: Duration::from_secs(config.account_timeout_secs),
            consistency_retries: config.consistency_retries,
            repair_on_backdated_insert: config.repair_on_backdated_insert,
        }
    }
}

/// Keeps every account's running balances consistent.
///
/// Cheap to share behind an `Arc`; all state lives in the store.
#[derive(Debug)]
pub struct LedgerEngine<S> {
    pub(super) store: S,
    pub(super) settings: EngineSettings,
}

impl<S: LedgerStore> LedgerEngine<S> {
    /// Creates an engine with default settings.
    pub fn new(store: S) -> Self {
        Self::with_settings(store, EngineSettings::default())
    }

    /// Creates an engine with explicit settings.
    pub const fn with_settings(store: S, settings: EngineSettings) -> Self {
        Self { store, settings }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Active settings.
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

/// Commits on success, rolls back on failure and hands back the outcome.
pub(super) async fn finish<T, X: LedgerTx>(
    tx: X,
    outcome: Result<T, LedgerError>,
) -> Result<T, LedgerError> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed after ledger error");
            }
            Err(err)
        }
    }
}

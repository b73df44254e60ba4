//! Account snapshot as seen by the engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use saldo_shared::types::{AccountId, TenantId};

/// An account from the registry.
///
/// The registry owns the lifecycle; the engine only reads it and maintains
/// `cached_balance`, which must always equal the sum of the account's
/// non-cancelled movements once no recalculation is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Owning tenant (company).
    pub tenant_id: TenantId,
    /// Display label.
    pub label: String,
    /// Denormalized current balance.
    pub cached_balance: Decimal,
}

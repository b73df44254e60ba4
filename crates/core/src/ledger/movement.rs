//! Movement domain types and canonical ordering.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use saldo_shared::types::{
    AMOUNT_LIMIT, AccountId, MovementId, has_currency_precision, within_amount_limit,
};

use super::error::LedgerError;

/// Lifecycle status of a movement.
///
/// Cancellation is a status change, never a deletion: cancelled movements stay
/// stored for the audit trail but no longer contribute to any balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementStatus {
    /// Recorded, not yet settled.
    Pending,
    /// Settled.
    Settled,
    /// Moved to another account.
    Transferred,
    /// Cancelled (kept for audit, excluded from balances).
    Cancelled,
}

impl MovementStatus {
    /// Returns true if movements with this status take part in the running balance.
    #[must_use]
    pub const fn counts_toward_balance(self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Returns true if no further transition is allowed out of this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Settled => "settled",
            Self::Transferred => "transferred",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "settled" => Ok(Self::Settled),
            "transferred" => Ok(Self::Transferred),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(LedgerError::Validation(format!("unknown movement status '{s}'"))),
        }
    }
}

/// Direction of a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Inflow (credit): positive signed amount.
    Entry,
    /// Outflow (debit): negative signed amount.
    Exit,
}

impl MovementType {
    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
        }
    }
}

impl FromStr for MovementType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entry" | "credit" => Ok(Self::Entry),
            "exit" | "debit" => Ok(Self::Exit),
            _ => Err(LedgerError::Validation(format!("unknown movement type '{s}'"))),
        }
    }
}

/// A validated entry/exit pair.
///
/// Exactly one side is non-zero, both are non-negative, carry at most two
/// decimal places and stay below [`AMOUNT_LIMIT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementAmount {
    entry: Decimal,
    exit: Decimal,
}

impl MovementAmount {
    /// Builds an amount from separate entry and exit values.
    pub fn from_entry_exit(entry: Decimal, exit: Decimal) -> Result<Self, LedgerError> {
        if entry < Decimal::ZERO || exit < Decimal::ZERO {
            return Err(LedgerError::Validation(
                "entry and exit amounts must not be negative".to_string(),
            ));
        }
        if entry.is_zero() == exit.is_zero() {
            return Err(LedgerError::Validation(
                "exactly one of entry and exit amounts must be non-zero".to_string(),
            ));
        }
        if !has_currency_precision(entry) || !has_currency_precision(exit) {
            return Err(LedgerError::Validation(
                "amounts must have at most two decimal places".to_string(),
            ));
        }
        if !within_amount_limit(entry) || !within_amount_limit(exit) {
            return Err(LedgerError::Validation(format!(
                "amounts must be below {AMOUNT_LIMIT}"
            )));
        }
        Ok(Self {
            entry: entry.normalize(),
            exit: exit.normalize(),
        })
    }

    /// Builds an amount from a signed value (positive = entry, negative = exit).
    pub fn from_signed(signed: Decimal) -> Result<Self, LedgerError> {
        if signed < Decimal::ZERO {
            Self::from_entry_exit(Decimal::ZERO, -signed)
        } else {
            Self::from_entry_exit(signed, Decimal::ZERO)
        }
    }

    /// Entry (inflow) side.
    #[must_use]
    pub const fn entry(&self) -> Decimal {
        self.entry
    }

    /// Exit (outflow) side.
    #[must_use]
    pub const fn exit(&self) -> Decimal {
        self.exit
    }

    /// `entry - exit`.
    #[must_use]
    pub fn signed(&self) -> Decimal {
        self.entry - self.exit
    }

    /// Direction of the amount.
    #[must_use]
    pub fn movement_type(&self) -> MovementType {
        if self.entry.is_zero() {
            MovementType::Exit
        } else {
            MovementType::Entry
        }
    }
}

/// A stored ledger movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Movement ID.
    pub id: MovementId,
    /// Owning account.
    pub account_id: AccountId,
    /// Business date; primary ordering key.
    pub movement_date: NaiveDate,
    /// Creation timestamp; first tie-breaker.
    pub created_at: DateTime<Utc>,
    /// Inflow amount (zero for exits).
    pub entry_amount: Decimal,
    /// Outflow amount (zero for entries).
    pub exit_amount: Decimal,
    /// Lifecycle status.
    pub status: MovementStatus,
    /// Balance immediately after this movement under canonical ordering.
    pub running_balance: Decimal,
    /// Free-text description (not interpreted).
    pub description: String,
    /// Free-text notes (not interpreted).
    pub notes: Option<String>,
}

impl Movement {
    /// Returns `entry_amount - exit_amount`.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.entry_amount - self.exit_amount
    }

    /// Returns the direction of the movement.
    #[must_use]
    pub fn movement_type(&self) -> MovementType {
        if self.entry_amount.is_zero() {
            MovementType::Exit
        } else {
            MovementType::Entry
        }
    }

    /// Returns true unless the movement is cancelled.
    #[must_use]
    pub fn counts_toward_balance(&self) -> bool {
        self.status.counts_toward_balance()
    }

    /// Returns the key that places this movement in canonical order.
    #[must_use]
    pub fn canonical_key(&self) -> CanonicalKey {
        CanonicalKey {
            movement_date: self.movement_date,
            created_at: self.created_at,
            id: self.id,
        }
    }
}

/// Total order over movements: `(movement_date, created_at, id)`, all ascending.
///
/// Field order matters: the derived `Ord` compares fields top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalKey {
    /// Business date.
    pub movement_date: NaiveDate,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Movement ID; makes the order total.
    pub id: MovementId,
}

/// Sorts movements into canonical order in place.
pub fn sort_canonical(movements: &mut [Movement]) {
    movements.sort_by_key(Movement::canonical_key);
}

/// Input for the write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    /// Account to post to.
    pub account_id: AccountId,
    /// Business date.
    pub movement_date: NaiveDate,
    /// Signed amount (positive = inflow, negative = outflow).
    pub signed_amount: Decimal,
    /// Initial status.
    pub status: MovementStatus,
    /// Free-text description.
    pub description: String,
    /// Free-text notes.
    pub notes: Option<String>,
}

/// Current time truncated to microseconds, the precision `timestamptz` stores.
///
/// Truncating before the value is handed out keeps in-memory and persisted
/// `created_at` values identical, so the canonical order never shifts on reload.
#[must_use]
pub fn storage_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

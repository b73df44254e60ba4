//! Running balance calculations.
//!
//! Pure functions only: no I/O, deterministic, total. The same input always
//! yields bit-identical output, which idempotent recalculation depends on.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use saldo_shared::types::MovementId;

use super::movement::Movement;

/// Computes the prefix sums of `ordered` starting from `opening`.
///
/// `result[i] = opening + ordered[0] + ... + ordered[i]`. Empty input yields
/// empty output.
#[must_use]
pub fn compute_running_balances(opening: Decimal, ordered: &[Decimal]) -> Vec<Decimal> {
    ordered
        .iter()
        .scan(opening, |balance, amount| {
            *balance += *amount;
            Some(*balance)
        })
        .collect()
}

/// Sum of the signed amounts of every non-cancelled movement.
///
/// Equal to the last element of the recomputed running-balance chain, or zero
/// when the account has no non-cancelled movements.
#[must_use]
pub fn current_balance(movements: &[Movement]) -> Decimal {
    movements
        .iter()
        .filter(|m| m.counts_toward_balance())
        .map(Movement::signed_amount)
        .sum()
}

/// A movement whose stored running balance disagrees with the recomputed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCorrection {
    /// The movement to fix.
    pub movement_id: MovementId,
    /// Value currently stored (used as the optimistic-lock guard).
    pub stored: Decimal,
    /// Value the chain requires.
    pub computed: Decimal,
}

/// Outcome of replaying one account's chain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChainPlan {
    /// Rows that need rewriting, in canonical order.
    pub corrections: Vec<BalanceCorrection>,
    /// Recomputed running balance of every non-cancelled movement, in canonical order.
    pub balances: Vec<(MovementId, Decimal)>,
    /// Balance after the last non-cancelled movement (or `opening` if none).
    pub final_balance: Decimal,
}

impl ChainPlan {
    /// Number of movements that take part in the chain.
    #[must_use]
    pub fn movement_count(&self) -> usize {
        self.balances.len()
    }

    /// Returns true if no stored balance needs rewriting.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.corrections.is_empty()
    }
}

/// Replays an account's chain and lists the rows whose stored balance is wrong.
///
/// Cancelled movements are skipped. Order is re-derived from the movements'
/// current field values, so the input may arrive in any order.
#[must_use]
pub fn plan_chain(opening: Decimal, movements: &[Movement]) -> ChainPlan {
    let mut chain: Vec<&Movement> = movements
        .iter()
        .filter(|m| m.counts_toward_balance())
        .collect();
    chain.sort_by_key(|m| m.canonical_key());

    let amounts: Vec<Decimal> = chain.iter().map(|m| m.signed_amount()).collect();
    let computed = compute_running_balances(opening, &amounts);

    let corrections = chain
        .iter()
        .zip(&computed)
        .filter(|(m, balance)| m.running_balance != **balance)
        .map(|(m, balance)| BalanceCorrection {
            movement_id: m.id,
            stored: m.running_balance,
            computed: *balance,
        })
        .collect();

    ChainPlan {
        corrections,
        balances: chain.iter().map(|m| m.id).zip(computed.iter().copied()).collect(),
        final_balance: computed.last().copied().unwrap_or(opening),
    }
}

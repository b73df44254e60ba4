//! Currency-precision helpers for monetary amounts.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal` values carrying at most two decimal places,
//! so long prefix sums stay exact.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places every stored amount and balance carries.
pub const CURRENCY_SCALE: u32 = 2;

/// Exclusive bound on amount magnitudes: `NUMERIC(19, 2)` keeps 17 integer digits.
pub const AMOUNT_LIMIT: i64 = 100_000_000_000_000_000;

/// Returns true if the magnitude of `amount` is below [`AMOUNT_LIMIT`].
#[must_use]
pub fn within_amount_limit(amount: Decimal) -> bool {
    amount.abs() < Decimal::from(AMOUNT_LIMIT)
}

/// Returns true if `amount` is representable with [`CURRENCY_SCALE`] decimal places.
///
/// Trailing zeros do not count, so `10.500` is accepted while `10.505` is not.
#[must_use]
pub fn has_currency_precision(amount: Decimal) -> bool {
    amount.normalize().scale() <= CURRENCY_SCALE
}

/// Rounds to [`CURRENCY_SCALE`] places using Banker's Rounding.
#[must_use]
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Formats an amount with exactly two decimal places (e.g. `70.00`, `-40.50`).
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    let mut rounded = round_currency(amount);
    rounded.rescale(CURRENCY_SCALE);
    rounded.to_string()
}

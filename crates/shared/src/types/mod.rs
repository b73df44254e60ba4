//! Common types used across the application.

pub mod id;
pub mod money;
pub mod pagination;

#[cfg(test)]
mod id_tests;

pub use id::*;
pub use money::{
    AMOUNT_LIMIT, CURRENCY_SCALE, format_money, has_currency_precision, round_currency,
    within_amount_limit,
};
pub use pagination::{Page, PageRequest, PaginationError};

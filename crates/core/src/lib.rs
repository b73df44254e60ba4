//! Core ledger logic for Saldo.
//!
//! This crate keeps every account's movements in canonical order with a correct
//! running balance attached to each one. It has ZERO web or database dependencies:
//! storage is reached through the [`ledger::LedgerStore`] seam.
//!
//! # Modules
//!
//! - `ledger` - movements, canonical ordering, running-balance computation, and the
//!   `LedgerEngine` that recalculates, synchronizes and queries accounts

pub mod ledger;

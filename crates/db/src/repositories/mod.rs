//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod account;
pub mod ledger;

pub use account::{AccountError, AccountRepository, CreateAccountInput};
pub use ledger::{LedgerRepository, LedgerTransaction};

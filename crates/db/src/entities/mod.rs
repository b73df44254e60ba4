//! `SeaORM` entity definitions.

pub mod accounts;
pub mod movements;
pub mod sea_orm_active_enums;

pub use accounts::Entity as Accounts;
pub use movements::Entity as Movements;

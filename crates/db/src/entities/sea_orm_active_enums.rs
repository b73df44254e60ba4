//! `SeaORM` active enums mirroring Postgres enum types.

use saldo_core::ledger;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `movement_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "movement_status")]
pub enum MovementStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "settled")]
    Settled,
    #[sea_orm(string_value = "transferred")]
    Transferred,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl From<ledger::MovementStatus> for MovementStatus {
    fn from(status: ledger::MovementStatus) -> Self {
        match status {
            ledger::MovementStatus::Pending => Self::Pending,
            ledger::MovementStatus::Settled => Self::Settled,
            ledger::MovementStatus::Transferred => Self::Transferred,
            ledger::MovementStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<MovementStatus> for ledger::MovementStatus {
    fn from(status: MovementStatus) -> Self {
        match status {
            MovementStatus::Pending => Self::Pending,
            MovementStatus::Settled => Self::Settled,
            MovementStatus::Transferred => Self::Transferred,
            MovementStatus::Cancelled => Self::Cancelled,
        }
    }
}

//! `SeaORM` Entity for movements table.

use chrono::Utc;
use saldo_core::ledger::Movement;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::MovementStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub movement_date: Date,
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub entry_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub exit_amount: Decimal,
    pub status: MovementStatus,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub running_balance: Decimal,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Movement {
    fn from(model: Model) -> Self {
        Self {
            id: model.id.into(),
            account_id: model.account_id.into(),
            movement_date: model.movement_date,
            created_at: model.created_at.with_timezone(&Utc),
            entry_amount: model.entry_amount,
            exit_amount: model.exit_amount,
            status: model.status.into(),
            running_balance: model.running_balance,
            description: model.description,
            notes: model.notes,
        }
    }
}

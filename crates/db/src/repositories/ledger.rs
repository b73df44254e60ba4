//! Postgres implementation of the ledger store.
//!
//! The account row is locked with `SELECT ... FOR UPDATE` for the whole
//! fetch-compute-persist cycle, and every running-balance write is guarded by
//! the value read earlier in the same transaction.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use saldo_core::ledger::{
    Account, BalanceCorrection, LedgerError, LedgerStore, LedgerTx, Movement, MovementFilter,
    MovementType,
};
use saldo_shared::types::{AccountId, MovementId, Page, PageRequest, TenantId};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    TransactionTrait, Unchanged,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::MovementStatus;
use crate::entities::{accounts, movements};

/// Maps a driver error into the ledger taxonomy.
fn db_err(err: DbErr) -> LedgerError {
    LedgerError::Storage(err.to_string())
}

/// Orders a movement query canonically: `(movement_date, created_at, id)`.
fn canonical_order(query: Select<movements::Entity>) -> Select<movements::Entity> {
    query
        .order_by_asc(movements::Column::MovementDate)
        .order_by_asc(movements::Column::CreatedAt)
        .order_by_asc(movements::Column::Id)
}

fn apply_filter(
    mut query: Select<movements::Entity>,
    filter: &MovementFilter,
) -> Select<movements::Entity> {
    if let Some(from) = filter.date_from {
        query = query.filter(movements::Column::MovementDate.gte(from));
    }
    if let Some(to) = filter.date_to {
        query = query.filter(movements::Column::MovementDate.lte(to));
    }
    if let Some(status) = filter.status {
        query = query.filter(movements::Column::Status.eq(MovementStatus::from(status)));
    }
    match filter.movement_type {
        Some(MovementType::Entry) => {
            query = query.filter(movements::Column::EntryAmount.gt(Decimal::ZERO));
        }
        Some(MovementType::Exit) => {
            query = query.filter(movements::Column::ExitAmount.gt(Decimal::ZERO));
        }
        None => {}
    }
    // One side is always zero, so the magnitude is whichever side is set.
    if let Some(min) = filter.value_min {
        query = query.filter(
            Condition::any()
                .add(movements::Column::EntryAmount.gte(min))
                .add(movements::Column::ExitAmount.gte(min)),
        );
    }
    if let Some(max) = filter.value_max {
        query = query
            .filter(movements::Column::EntryAmount.lte(max))
            .filter(movements::Column::ExitAmount.lte(max));
    }
    query
}

/// Ledger store backed by Postgres.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for LedgerRepository {
    type Tx = LedgerTransaction;

    async fn begin(&self) -> Result<Self::Tx, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        Ok(LedgerTransaction { txn })
    }

    async fn list_account_ids(&self, tenant_id: TenantId) -> Result<Vec<AccountId>, LedgerError> {
        let ids: Vec<Uuid> = accounts::Entity::find()
            .select_only()
            .column(accounts::Column::Id)
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(accounts::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(ids.into_iter().map(AccountId::from).collect())
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        accounts::Entity::find_by_id(account_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(Account::from)
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    async fn find_movement(
        &self,
        movement_id: MovementId,
    ) -> Result<Option<Movement>, LedgerError> {
        let movement = movements::Entity::find_by_id(movement_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(movement.map(Movement::from))
    }

    async fn query_movements(
        &self,
        account_ids: &[AccountId],
        filter: &MovementFilter,
        page: Option<PageRequest>,
    ) -> Result<Page<Movement>, LedgerError> {
        let ids: Vec<Uuid> = account_ids.iter().map(|id| id.into_inner()).collect();
        let query = apply_filter(
            movements::Entity::find().filter(movements::Column::AccountId.is_in(ids)),
            filter,
        );

        let total = query.clone().count(&self.db).await.map_err(db_err)?;

        let mut query = canonical_order(query);
        if let Some(page) = page {
            query = query.offset(page.offset()).limit(page.limit());
        }
        let rows = query.all(&self.db).await.map_err(db_err)?;

        Ok(Page::new(rows.into_iter().map(Movement::from).collect(), total))
    }
}

/// A Postgres transaction over the ledger tables.
#[derive(Debug)]
pub struct LedgerTransaction {
    txn: DatabaseTransaction,
}

#[async_trait]
impl LedgerTx for LedgerTransaction {
    async fn lock_account(&mut self, account_id: AccountId) -> Result<Account, LedgerError> {
        accounts::Entity::find_by_id(account_id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(Account::from)
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    async fn load_chain(&mut self, account_id: AccountId) -> Result<Vec<Movement>, LedgerError> {
        let rows = canonical_order(
            movements::Entity::find()
                .filter(movements::Column::AccountId.eq(account_id.into_inner()))
                .filter(movements::Column::Status.ne(MovementStatus::Cancelled)),
        )
        .all(&self.txn)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Movement::from).collect())
    }

    async fn fetch_movement(
        &mut self,
        movement_id: MovementId,
    ) -> Result<Option<Movement>, LedgerError> {
        let movement = movements::Entity::find_by_id(movement_id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(movement.map(Movement::from))
    }

    async fn insert_movement(&mut self, movement: &Movement) -> Result<(), LedgerError> {
        let row = movements::ActiveModel {
            id: Set(movement.id.into_inner()),
            account_id: Set(movement.account_id.into_inner()),
            movement_date: Set(movement.movement_date),
            created_at: Set(movement.created_at.into()),
            entry_amount: Set(movement.entry_amount),
            exit_amount: Set(movement.exit_amount),
            status: Set(movement.status.into()),
            running_balance: Set(movement.running_balance),
            description: Set(movement.description.clone()),
            notes: Set(movement.notes.clone()),
            updated_at: Set(Utc::now().into()),
        };
        movements::Entity::insert(row)
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_running_balance(
        &mut self,
        account_id: AccountId,
        correction: &BalanceCorrection,
    ) -> Result<(), LedgerError> {
        let result = movements::Entity::update_many()
            .col_expr(
                movements::Column::RunningBalance,
                Expr::value(correction.computed),
            )
            .col_expr(movements::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(movements::Column::Id.eq(correction.movement_id.into_inner()))
            .filter(movements::Column::AccountId.eq(account_id.into_inner()))
            .filter(movements::Column::RunningBalance.eq(correction.stored))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            debug!(
                account_id = %account_id,
                movement_id = %correction.movement_id,
                "Guarded balance update matched no row"
            );
            return Err(LedgerError::ConcurrentModification {
                account_id,
                movement_id: correction.movement_id,
            });
        }
        Ok(())
    }

    async fn update_movement(&mut self, movement: &Movement) -> Result<(), LedgerError> {
        let row = movements::ActiveModel {
            id: Unchanged(movement.id.into_inner()),
            movement_date: Set(movement.movement_date),
            status: Set(movement.status.into()),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        match row.update(&self.txn).await {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => Err(LedgerError::MovementNotFound(movement.id)),
            Err(err) => Err(db_err(err)),
        }
    }

    async fn set_cached_balance(
        &mut self,
        account_id: AccountId,
        balance: Decimal,
    ) -> Result<(), LedgerError> {
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::CachedBalance, Expr::value(balance))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(accounts::Column::Id.eq(account_id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(LedgerError::AccountNotFound(account_id));
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), LedgerError> {
        self.txn.commit().await.map_err(db_err)
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        self.txn.rollback().await.map_err(db_err)
    }
}

//! Account registry repository.
//!
//! The ledger engine only reads accounts and writes their cached balance; this
//! repository covers the rest of the registry surface the server, seeder and
//! tests need.

use rust_decimal::Decimal;
use saldo_core::ledger::Account;
use saldo_shared::types::{AccountId, TenantId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use tracing::info;

use crate::entities::accounts;

/// Longest accepted account label.
const MAX_LABEL_LEN: usize = 255;

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Label is empty or too long.
    #[error("Invalid account label: {0}")]
    InvalidLabel(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display label.
    pub label: String,
}

/// Account repository for registry operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account with a zero cached balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the label is empty or longer than 255 characters,
    /// or if the insert fails.
    pub async fn create_account(&self, input: CreateAccountInput) -> Result<Account, AccountError> {
        let label = input.label.trim().to_string();
        if label.is_empty() {
            return Err(AccountError::InvalidLabel("label must not be empty".to_string()));
        }
        if label.chars().count() > MAX_LABEL_LEN {
            return Err(AccountError::InvalidLabel(format!(
                "label must be at most {MAX_LABEL_LEN} characters"
            )));
        }

        let now = chrono::Utc::now().into();
        let account = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            tenant_id: Set(input.tenant_id.into_inner()),
            label: Set(label),
            cached_balance: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let account: Account = account.insert(&self.db).await?.into();
        info!(account_id = %account.id, tenant_id = %account.tenant_id, "Account created");
        Ok(account)
    }

    /// Finds an account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, DbErr> {
        let account = accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?;
        Ok(account.map(Account::from))
    }

    /// Lists a tenant's accounts ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Account>, DbErr> {
        let accounts = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(accounts::Column::Id)
            .all(&self.db)
            .await?;
        Ok(accounts.into_iter().map(Account::from).collect())
    }
}

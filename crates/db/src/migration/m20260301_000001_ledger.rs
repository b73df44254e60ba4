//! Ledger schema migration.
//!
//! Creates the movement status enum, the accounts table carrying the cached
//! balance, and the movements table with its canonical-order index.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: ACCOUNT REGISTRY
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: MOVEMENTS
        // ============================================================
        db.execute_unprepared(MOVEMENTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Movement lifecycle; cancelled rows stay stored but leave the balance chain
CREATE TYPE movement_status AS ENUM ('pending', 'settled', 'transferred', 'cancelled');
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    label VARCHAR(255) NOT NULL,
    cached_balance NUMERIC(19, 2) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_accounts_tenant ON accounts(tenant_id, id);
";

const MOVEMENTS_SQL: &str = r"
CREATE TABLE movements (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    account_id UUID NOT NULL REFERENCES accounts(id),
    movement_date DATE NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    entry_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    exit_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    status movement_status NOT NULL DEFAULT 'pending',
    running_balance NUMERIC(19, 2) NOT NULL DEFAULT 0,
    description TEXT NOT NULL DEFAULT '',
    notes TEXT,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_amounts_non_negative CHECK (entry_amount >= 0 AND exit_amount >= 0),
    CONSTRAINT chk_one_side_only CHECK ((entry_amount = 0) <> (exit_amount = 0))
);

-- Canonical order: (movement_date, created_at, id) within an account
CREATE INDEX idx_movements_canonical ON movements(account_id, movement_date, created_at, id);

-- Chain loads skip cancelled rows
CREATE INDEX idx_movements_active ON movements(account_id, movement_date, created_at, id)
    WHERE status <> 'cancelled';
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS movements CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TYPE IF EXISTS movement_status;
";

//! Database seeder for Saldo development and testing.
//!
//! Seeds a demo tenant with two accounts whose movements are recorded out of
//! date order, so the stored running balances start stale. A tenant
//! recalculation then repairs them, which is handy for trying the audit and
//! recalculation endpoints by hand.
//!
//! Usage: cargo run --bin seeder

use std::str::FromStr;

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use saldo_core::ledger::{
    AccountRecalcStatus, EngineSettings, LedgerEngine, MovementStatus, NewMovement,
};
use saldo_db::repositories::{AccountRepository, CreateAccountInput, LedgerRepository};
use saldo_shared::types::{AccountId, TenantId, format_money};
use uuid::Uuid;

/// Demo tenant ID (consistent for all seeds)
const DEMO_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// (day of January 2026, signed amount, status, description), in recording order.
const CHECKING: &[(u32, &str, MovementStatus, &str)] = &[
    (1, "1500.00", MovementStatus::Settled, "Opening deposit"),
    (5, "-420.10", MovementStatus::Settled, "Rent"),
    (3, "-35.90", MovementStatus::Settled, "Groceries"),
    (9, "2300.00", MovementStatus::Pending, "Salary"),
    (2, "-12.00", MovementStatus::Cancelled, "Duplicate card charge"),
    (4, "-60.00", MovementStatus::Transferred, "Moved to savings"),
];

const SAVINGS: &[(u32, &str, MovementStatus, &str)] = &[
    (4, "60.00", MovementStatus::Settled, "From checking"),
    (1, "1000.00", MovementStatus::Settled, "Opening deposit"),
    (8, "-250.00", MovementStatus::Settled, "Withdrawal"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = saldo_db::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    let tenant_id = TenantId::from(Uuid::from_str(DEMO_TENANT_ID)?);
    let accounts = AccountRepository::new(db.clone());
    if !accounts.list_by_tenant(tenant_id).await?.is_empty() {
        println!("  Demo tenant already seeded, skipping...");
        return Ok(());
    }

    // Leave backdated inserts stale so the recalculation has work to do.
    let engine = LedgerEngine::with_settings(
        LedgerRepository::new(db),
        EngineSettings {
            repair_on_backdated_insert: false,
            ..EngineSettings::default()
        },
    );

    println!("Seeding demo accounts...");
    for (label, movements) in [("Checking", CHECKING), ("Savings", SAVINGS)] {
        let account = accounts
            .create_account(CreateAccountInput {
                tenant_id,
                label: label.to_string(),
            })
            .await?;
        seed_movements(&engine, account.id, movements).await?;
        println!("  {label}: {} movements", movements.len());
    }

    println!("Recalculating demo tenant...");
    let report = engine.recalculate_all_accounts(tenant_id).await?;
    for outcome in &report.outcomes {
        match &outcome.status {
            AccountRecalcStatus::Ok {
                final_balance,
                updated_count,
            } => println!(
                "  {}: balance {}, {updated_count} rows repaired",
                outcome.account_id,
                format_money(*final_balance)
            ),
            AccountRecalcStatus::Failed { error_code, message } => {
                println!("  {}: failed ({error_code}): {message}", outcome.account_id);
            }
        }
    }

    println!("Seeding complete!");
    Ok(())
}

async fn seed_movements(
    engine: &LedgerEngine<LedgerRepository>,
    account_id: AccountId,
    movements: &[(u32, &str, MovementStatus, &str)],
) -> anyhow::Result<()> {
    for &(day, amount, status, description) in movements {
        let movement_date =
            NaiveDate::from_ymd_opt(2026, 1, day).context("invalid seed date")?;
        engine
            .insert_movement(NewMovement {
                account_id,
                movement_date,
                signed_amount: Decimal::from_str(amount)?,
                status,
                description: description.to_string(),
                notes: None,
            })
            .await?;
    }
    Ok(())
}

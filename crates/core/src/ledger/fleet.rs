//! Fleet recalculation: every account of a tenant, failures isolated per account.

use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use saldo_shared::types::{AccountId, TenantId};
use tracing::{info, warn};

use super::engine::LedgerEngine;
use super::error::LedgerError;
use super::store::LedgerStore;

/// Per-account result within a [`FleetReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AccountRecalcStatus {
    /// Recalculation committed.
    Ok {
        /// Balance after the last non-cancelled movement.
        final_balance: Decimal,
        /// Rows rewritten.
        updated_count: usize,
    },
    /// Recalculation failed and was rolled back.
    Failed {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable reason.
        message: String,
    },
}

/// One account's entry in a [`FleetReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecalcOutcome {
    /// The account.
    pub account_id: AccountId,
    /// What happened to it.
    #[serde(flatten)]
    pub status: AccountRecalcStatus,
}

impl AccountRecalcOutcome {
    /// Returns true if the account was recalculated.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, AccountRecalcStatus::Ok { .. })
    }
}

/// Successes and per-account failures side by side, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetReport {
    /// One outcome per requested account.
    pub outcomes: Vec<AccountRecalcOutcome>,
}

impl FleetReport {
    /// Accounts recalculated successfully.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    /// Accounts that failed.
    pub fn failures(&self) -> impl Iterator<Item = &AccountRecalcOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    /// Accounts whose recalculation rewrote at least one row.
    #[must_use]
    pub fn fixed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, AccountRecalcStatus::Ok { updated_count, .. } if updated_count > 0))
            .count()
    }

    /// Returns true if no account failed.
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

impl<S: LedgerStore> LedgerEngine<S> {
    /// Recalculates the given accounts, at most `fleet_concurrency` at a time.
    ///
    /// Never fails as a whole: each account's error is captured in its outcome.
    /// Outcomes come back in the order of `account_ids`.
    pub async fn recalculate_accounts(&self, account_ids: &[AccountId]) -> FleetReport {
        let outcomes: Vec<AccountRecalcOutcome> = stream::iter(account_ids.iter().copied())
            .map(|account_id| async move {
                let status = match self.recalculate_account(account_id).await {
                    Ok(result) => AccountRecalcStatus::Ok {
                        final_balance: result.final_balance,
                        updated_count: result.updated_count,
                    },
                    Err(err) => {
                        warn!(
                            account_id = %account_id,
                            code = err.error_code(),
                            error = %err,
                            "Account recalculation failed"
                        );
                        AccountRecalcStatus::Failed {
                            error_code: err.error_code().to_string(),
                            message: err.public_message(),
                        }
                    }
                };
                AccountRecalcOutcome { account_id, status }
            })
            .buffered(self.settings.fleet_concurrency.max(1))
            .collect()
            .await;

        let report = FleetReport { outcomes };
        info!(
            accounts = report.outcomes.len(),
            succeeded = report.succeeded(),
            failed = report.outcomes.len() - report.succeeded(),
            fixed = report.fixed_count(),
            "Fleet recalculation finished"
        );
        report
    }

    /// Recalculates every account of a tenant.
    ///
    /// Fails only if the tenant's accounts cannot be listed.
    pub async fn recalculate_all_accounts(
        &self,
        tenant_id: TenantId,
    ) -> Result<FleetReport, LedgerError> {
        let account_ids = self.store.list_account_ids(tenant_id).await?;
        info!(tenant_id = %tenant_id, accounts = account_ids.len(), "Starting fleet recalculation");
        Ok(self.recalculate_accounts(&account_ids).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ok(updated_count: usize) -> AccountRecalcOutcome {
        AccountRecalcOutcome {
            account_id: AccountId::new(),
            status: AccountRecalcStatus::Ok {
                final_balance: dec!(10),
                updated_count,
            },
        }
    }

    fn failed() -> AccountRecalcOutcome {
        AccountRecalcOutcome {
            account_id: AccountId::new(),
            status: AccountRecalcStatus::Failed {
                error_code: "STORAGE_ERROR".to_string(),
                message: "disk on fire".to_string(),
            },
        }
    }

    #[test]
    fn test_report_counts() {
        let report = FleetReport {
            outcomes: vec![ok(0), failed(), ok(3)],
        };
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.fixed_count(), 1);
        assert!(!report.is_complete_success());
    }

    #[test]
    fn test_empty_report_is_complete_success() {
        assert!(FleetReport::default().is_complete_success());
    }

    #[test]
    fn test_outcome_serializes_flat_with_status_tag() {
        let json = serde_json::to_value(failed()).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error_code"], "STORAGE_ERROR");
        assert!(json.get("account_id").is_some());
    }
}

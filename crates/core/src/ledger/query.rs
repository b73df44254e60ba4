//! Read-only query gateway.

use std::collections::BTreeSet;

use saldo_shared::types::{AccountId, Page, PageRequest};

use super::engine::LedgerEngine;
use super::error::LedgerError;
use super::filter::MovementFilter;
use super::movement::Movement;
use super::store::LedgerStore;

impl<S: LedgerStore> LedgerEngine<S> {
    /// Returns movements of the given accounts in canonical order.
    ///
    /// An empty account set yields an empty page, never an unfiltered scan.
    /// Malformed filters and page bounds are rejected before storage is touched.
    pub async fn query_movements(
        &self,
        account_ids: &BTreeSet<AccountId>,
        filter: &MovementFilter,
        page: Option<PageRequest>,
    ) -> Result<Page<Movement>, LedgerError> {
        if account_ids.is_empty() {
            return Ok(Page::empty());
        }
        filter.validate()?;
        if let Some(page) = &page {
            page.validate()?;
        }

        let ids: Vec<AccountId> = account_ids.iter().copied().collect();
        self.store.query_movements(&ids, filter, page).await
    }

    /// Returns one account's movements in canonical order, paged.
    ///
    /// Fails with `AccountNotFound` for an unknown account.
    pub async fn query_account_movements(
        &self,
        account_id: AccountId,
        filter: &MovementFilter,
        page: PageRequest,
    ) -> Result<Page<Movement>, LedgerError> {
        filter.validate()?;
        page.validate()?;
        self.store.get_account(account_id).await?;
        self.store
            .query_movements(&[account_id], filter, Some(page))
            .await
    }
}

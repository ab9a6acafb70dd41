//! # LedgerStore for SQLite
//!
//! Wires the repositories into the ledger engine's storage seam.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LedgerStore method      │  SQL                                        │
//! │──────────────────────────┼─────────────────────────────────────────────│
//! │  next_sequence           │  INSERT .. ON CONFLICT .. +1 RETURNING      │
//! │  increment_summary       │  INSERT .. ON CONFLICT .. += excluded       │
//! │  recompute_summary       │  INSERT .. SELECT aggregates .. ON CONFLICT │
//! │  close_day               │  UPDATE .. WHERE is_closed = 0 RETURNING    │
//! │  insert_invoice          │  INSERT (UNIQUE invoice_number)             │
//! │  record_print            │  UPDATE .. print_count + 1 RETURNING        │
//! │  purge                   │  DELETE both tables in one transaction      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use till_core::{DailySummary, DateRange, Invoice, InvoicePage, Money, Page};
use till_ledger::{LedgerStore, PurgeReport, StoreResult};
use tracing::info;

use crate::error::DbResult;
use crate::pool::Database;

impl Database {
    /// Empties both ledger tables atomically.
    async fn purge_all(&self) -> DbResult<PurgeReport> {
        let mut tx = self.pool().begin().await?;

        let invoices_deleted = sqlx::query("DELETE FROM invoices")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let summaries_deleted = sqlx::query("DELETE FROM daily_summaries")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        info!(invoices_deleted, summaries_deleted, "Ledger purged");
        Ok(PurgeReport {
            invoices_deleted,
            summaries_deleted,
        })
    }
}

#[async_trait]
impl LedgerStore for Database {
    async fn next_sequence(&self, date: NaiveDate) -> StoreResult<i64> {
        Ok(self.summaries().next_sequence(date).await?)
    }

    async fn increment_summary(
        &self,
        date: NaiveDate,
        total: Money,
        discount: Money,
    ) -> StoreResult<()> {
        Ok(self
            .summaries()
            .increment(date, total.cents(), discount.cents())
            .await?)
    }

    async fn recompute_summary(&self, date: NaiveDate) -> StoreResult<DailySummary> {
        Ok(self.summaries().recompute(date).await?)
    }

    async fn summary(&self, date: NaiveDate) -> StoreResult<Option<DailySummary>> {
        Ok(self.summaries().get(date).await?)
    }

    async fn summaries_between(&self, range: DateRange) -> StoreResult<Vec<DailySummary>> {
        Ok(self.summaries().between(range.start, range.end).await?)
    }

    async fn close_day(
        &self,
        date: NaiveDate,
        at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> StoreResult<Option<DailySummary>> {
        Ok(self.summaries().close(date, at, notes).await?)
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> StoreResult<()> {
        Ok(self.invoices().insert(invoice).await?)
    }

    async fn invoice_by_id(&self, id: &str) -> StoreResult<Option<Invoice>> {
        Ok(self.invoices().get_by_id(id).await?)
    }

    async fn invoice_by_number(&self, invoice_number: &str) -> StoreResult<Option<Invoice>> {
        Ok(self.invoices().get_by_number(invoice_number).await?)
    }

    async fn list_invoices(&self, range: DateRange, page: Page) -> StoreResult<InvoicePage> {
        let repo = self.invoices();
        let total = repo.count_between(range.start, range.end).await?;
        let invoices = repo
            .list_between(
                range.start,
                range.end,
                i64::from(page.size),
                page.offset() as i64,
            )
            .await?;

        Ok(InvoicePage {
            invoices,
            page,
            total: total as u64,
        })
    }

    async fn update_invoice(&self, invoice: &Invoice) -> StoreResult<()> {
        Ok(self.invoices().update_fields(invoice).await?)
    }

    async fn record_print(&self, id: &str, at: DateTime<Utc>) -> StoreResult<Option<Invoice>> {
        Ok(self.invoices().record_print(id, at).await?)
    }

    async fn delete_invoice(&self, id: &str) -> StoreResult<Option<Invoice>> {
        Ok(self.invoices().delete(id).await?)
    }

    async fn delete_invoices_on(&self, date: NaiveDate) -> StoreResult<u64> {
        Ok(self.invoices().delete_on(date).await?)
    }

    async fn invoice_count_on(&self, date: NaiveDate) -> StoreResult<i64> {
        Ok(self.invoices().count_on(date).await?)
    }

    async fn purge(&self) -> StoreResult<PurgeReport> {
        Ok(self.purge_all().await?)
    }

    async fn health_check(&self) -> bool {
        Database::health_check(self).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

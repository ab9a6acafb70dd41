//! # Ledger Store Seam
//!
//! The single storage interface every component is built against.
//!
//! ## Backends
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        LedgerStore (this trait)                         │
//! │                                                                         │
//! │        ┌────────────────────────┐     ┌────────────────────────┐       │
//! │        │  till_db::Database     │     │  MemoryStore           │       │
//! │        │  SQLite via sqlx       │     │  tokio Mutex + maps    │       │
//! │        │  production            │     │  tests / demos         │       │
//! │        └────────────────────────┘     └────────────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity Contract
//! Every method that mutates a `daily_summaries` row is ONE atomic step in
//! the backend:
//!
//! | Method               | Effect                                             |
//! |----------------------|----------------------------------------------------|
//! | `next_sequence`      | insert-if-absent + `last_sequence_number += 1`, returns new value |
//! | `increment_summary`  | insert-if-absent + add one invoice's totals         |
//! | `recompute_summary`  | overwrite totals from the ledger, `max()` the mark  |
//! | `close_day`          | `is_closed = true` only where currently open        |
//!
//! Two callers can never observe the same pre-increment sequence value.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use till_core::{DailySummary, DateRange, Invoice, InvoicePage, Money, Page};

use crate::error::StoreResult;

/// Rows removed by a full purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PurgeReport {
    pub invoices_deleted: u64,
    pub summaries_deleted: u64,
}

/// Storage operations needed by the ledger engine.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // -------------------------------------------------------------------------
    // Numbering and aggregates
    // -------------------------------------------------------------------------

    /// Atomically bumps and returns the day's sequence, creating the summary
    /// row on first use.
    async fn next_sequence(&self, date: NaiveDate) -> StoreResult<i64>;

    /// Atomically adds one invoice's totals to the day's summary.
    async fn increment_summary(
        &self,
        date: NaiveDate,
        total: Money,
        discount: Money,
    ) -> StoreResult<()>;

    /// Recomputes the day's totals from the ledger in one atomic step and
    /// returns the stored result. Day-close fields are left untouched.
    async fn recompute_summary(&self, date: NaiveDate) -> StoreResult<DailySummary>;

    async fn summary(&self, date: NaiveDate) -> StoreResult<Option<DailySummary>>;

    /// Stored summaries inside the range, ordered by date. Days without a
    /// row are simply absent.
    async fn summaries_between(&self, range: DateRange) -> StoreResult<Vec<DailySummary>>;

    /// Marks an open day closed, merging `notes`. Returns `None` when there
    /// is no open row for `date` (absent or already closed).
    async fn close_day(
        &self,
        date: NaiveDate,
        at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> StoreResult<Option<DailySummary>>;

    // -------------------------------------------------------------------------
    // Ledger rows
    // -------------------------------------------------------------------------

    /// Inserts a row. A clash on `invoice_number` must surface as
    /// [`StoreError::UniqueViolation`](crate::error::StoreError::UniqueViolation)
    /// with a field naming `invoice_number`.
    async fn insert_invoice(&self, invoice: &Invoice) -> StoreResult<()>;

    async fn invoice_by_id(&self, id: &str) -> StoreResult<Option<Invoice>>;

    async fn invoice_by_number(&self, invoice_number: &str) -> StoreResult<Option<Invoice>>;

    /// Invoices whose ledger date falls in `range`, ordered by date then
    /// sequence.
    async fn list_invoices(&self, range: DateRange, page: Page) -> StoreResult<InvoicePage>;

    /// Writes the editable business fields of an existing row (customer,
    /// notes, items, amounts, status). Print bookkeeping is not touched.
    async fn update_invoice(&self, invoice: &Invoice) -> StoreResult<()>;

    /// Atomically records one print. Returns the updated row.
    async fn record_print(&self, id: &str, at: DateTime<Utc>) -> StoreResult<Option<Invoice>>;

    /// Removes a row and returns it.
    async fn delete_invoice(&self, id: &str) -> StoreResult<Option<Invoice>>;

    /// Removes every row of one ledger date. Returns the number removed.
    async fn delete_invoices_on(&self, date: NaiveDate) -> StoreResult<u64>;

    async fn invoice_count_on(&self, date: NaiveDate) -> StoreResult<i64>;

    /// Deletes every invoice and every summary.
    async fn purge(&self) -> StoreResult<PurgeReport>;

    /// True when the backend answers.
    async fn health_check(&self) -> bool;
}

//! # In-Memory Ledger Store
//!
//! A [`LedgerStore`] that keeps everything in process memory behind one
//! tokio `Mutex`. Every trait method takes the lock once, so each call is
//! atomic with respect to every other call.
//!
//! Used by unit tests, by the allocator property tests, and anywhere a
//! throwaway ledger is handy.
//!
//! ## Fault Injection
//! ```text
//! set_unavailable(true)       → every call fails with StoreError::Unavailable
//! fail_next_increments(n)     → next n increment_summary calls fail
//! collide_next_insert(hook)   → next insert runs `hook` against the state,
//!                               then reports an invoice_number clash
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use till_core::{
    merge_notes, DailySummary, DateRange, Invoice, InvoicePage, LedgerStats, Money, Page,
};
use tokio::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::store::{LedgerStore, PurgeReport};

/// Runs against the locked state before a forced collision is reported.
pub type CollisionHook = Box<dyn FnOnce(&mut MemoryState) + Send>;

// =============================================================================
// State
// =============================================================================

/// Everything the store holds.
#[derive(Default)]
pub struct MemoryState {
    invoices: HashMap<String, Invoice>,
    numbers: HashMap<String, String>,
    summaries: BTreeMap<NaiveDate, DailySummary>,
    unavailable: bool,
    failing_increments: u32,
    collisions: VecDeque<Option<CollisionHook>>,
}

impl MemoryState {
    /// Bumps and returns the day's sequence.
    pub fn next_sequence(&mut self, date: NaiveDate) -> i64 {
        let summary = self
            .summaries
            .entry(date)
            .or_insert_with(|| DailySummary::empty(date));
        summary.last_sequence_number += 1;
        summary.last_sequence_number
    }

    /// Inserts a row, enforcing both unique keys.
    pub fn insert(&mut self, invoice: Invoice) -> StoreResult<()> {
        if self.numbers.contains_key(&invoice.invoice_number) {
            return Err(StoreError::UniqueViolation {
                field: "invoices.invoice_number".to_string(),
                value: invoice.invoice_number,
            });
        }
        if self.invoices.contains_key(&invoice.id) {
            return Err(StoreError::UniqueViolation {
                field: "invoices.id".to_string(),
                value: invoice.id,
            });
        }
        self.numbers
            .insert(invoice.invoice_number.clone(), invoice.id.clone());
        self.invoices.insert(invoice.id.clone(), invoice);
        Ok(())
    }

    /// COUNT / SUM / MAX(suffix) over one day.
    pub fn stats(&self, date: NaiveDate) -> LedgerStats {
        LedgerStats::from_invoices(self.invoices.values().filter(|i| i.ledger_date == date))
    }

    /// Applies the reconciliation rule to the stored row.
    pub fn recompute(&mut self, date: NaiveDate) -> DailySummary {
        let stats = self.stats(date);
        let summary = DailySummary::reconciled(date, self.summaries.get(&date), &stats);
        self.summaries.insert(date, summary.clone());
        summary
    }

    /// Overwrites a summary row as-is. Lets tests plant drifted caches.
    pub fn put_summary(&mut self, summary: DailySummary) {
        self.summaries.insert(summary.date, summary);
    }

    fn remove(&mut self, id: &str) -> Option<Invoice> {
        let invoice = self.invoices.remove(id)?;
        self.numbers.remove(&invoice.invoice_number);
        Some(invoice)
    }

    fn check(&self) -> StoreResult<()> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Store
// =============================================================================

/// In-memory [`LedgerStore`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the locked state.
    pub async fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut state = self.state.lock().await;
        f(&mut *state)
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    pub async fn fail_next_increments(&self, count: u32) {
        self.state.lock().await.failing_increments = count;
    }

    /// Makes the next insert report an `invoice_number` clash.
    ///
    /// `hook` runs first, under the same lock, so a test can play a rival
    /// request that allocates and inserts in between.
    pub async fn collide_next_insert(&self, hook: Option<CollisionHook>) {
        self.state.lock().await.collisions.push_back(hook);
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn next_sequence(&self, date: NaiveDate) -> StoreResult<i64> {
        let mut state = self.state.lock().await;
        state.check()?;
        Ok(state.next_sequence(date))
    }

    async fn increment_summary(
        &self,
        date: NaiveDate,
        total: Money,
        discount: Money,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.check()?;
        if state.failing_increments > 0 {
            state.failing_increments -= 1;
            return Err(StoreError::Query("injected increment failure".to_string()));
        }
        state
            .summaries
            .entry(date)
            .or_insert_with(|| DailySummary::empty(date))
            .record_append(total, discount);
        Ok(())
    }

    async fn recompute_summary(&self, date: NaiveDate) -> StoreResult<DailySummary> {
        let mut state = self.state.lock().await;
        state.check()?;
        Ok(state.recompute(date))
    }

    async fn summary(&self, date: NaiveDate) -> StoreResult<Option<DailySummary>> {
        let state = self.state.lock().await;
        state.check()?;
        Ok(state.summaries.get(&date).cloned())
    }

    async fn summaries_between(&self, range: DateRange) -> StoreResult<Vec<DailySummary>> {
        let state = self.state.lock().await;
        state.check()?;
        Ok(state
            .summaries
            .range(range.start..=range.end)
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn close_day(
        &self,
        date: NaiveDate,
        at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> StoreResult<Option<DailySummary>> {
        let mut state = self.state.lock().await;
        state.check()?;
        match state.summaries.get_mut(&date) {
            Some(summary) if !summary.is_closed => {
                summary.is_closed = true;
                summary.closed_at = Some(at);
                summary.notes = merge_notes(summary.notes.as_deref(), notes);
                Ok(Some(summary.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.check()?;
        if let Some(hook) = state.collisions.pop_front() {
            if let Some(hook) = hook {
                hook(&mut *state);
            }
            return Err(StoreError::UniqueViolation {
                field: "invoices.invoice_number".to_string(),
                value: invoice.invoice_number.clone(),
            });
        }
        state.insert(invoice.clone())
    }

    async fn invoice_by_id(&self, id: &str) -> StoreResult<Option<Invoice>> {
        let state = self.state.lock().await;
        state.check()?;
        Ok(state.invoices.get(id).cloned())
    }

    async fn invoice_by_number(&self, invoice_number: &str) -> StoreResult<Option<Invoice>> {
        let state = self.state.lock().await;
        state.check()?;
        Ok(state
            .numbers
            .get(invoice_number)
            .and_then(|id| state.invoices.get(id))
            .cloned())
    }

    async fn list_invoices(&self, range: DateRange, page: Page) -> StoreResult<InvoicePage> {
        let state = self.state.lock().await;
        state.check()?;
        let mut rows: Vec<&Invoice> = state
            .invoices
            .values()
            .filter(|i| range.contains(i.ledger_date))
            .collect();
        rows.sort_by_key(|i| {
            let sequence = i.number().map(|n| n.sequence()).unwrap_or_default();
            (i.ledger_date, sequence, i.invoice_number.clone())
        });
        let total = rows.len() as u64;
        let invoices = rows
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .cloned()
            .collect();
        Ok(InvoicePage {
            invoices,
            page,
            total,
        })
    }

    async fn update_invoice(&self, invoice: &Invoice) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.check()?;
        let stored = state
            .invoices
            .get_mut(&invoice.id)
            .ok_or_else(|| StoreError::not_found("Invoice", invoice.id.as_str()))?;
        stored.customer_name = invoice.customer_name.clone();
        stored.customer_phone = invoice.customer_phone.clone();
        stored.customer_address = invoice.customer_address.clone();
        stored.notes = invoice.notes.clone();
        stored.items = invoice.items.clone();
        stored.total_cents = invoice.total_cents;
        stored.discount_cents = invoice.discount_cents;
        stored.final_total_cents = invoice.final_total_cents;
        stored.status = invoice.status;
        Ok(())
    }

    async fn record_print(&self, id: &str, at: DateTime<Utc>) -> StoreResult<Option<Invoice>> {
        let mut state = self.state.lock().await;
        state.check()?;
        Ok(state.invoices.get_mut(id).map(|invoice| {
            invoice.mark_printed(at);
            invoice.clone()
        }))
    }

    async fn delete_invoice(&self, id: &str) -> StoreResult<Option<Invoice>> {
        let mut state = self.state.lock().await;
        state.check()?;
        Ok(state.remove(id))
    }

    async fn delete_invoices_on(&self, date: NaiveDate) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        state.check()?;
        let ids: Vec<String> = state
            .invoices
            .values()
            .filter(|i| i.ledger_date == date)
            .map(|i| i.id.clone())
            .collect();
        for id in &ids {
            state.remove(id);
        }
        Ok(ids.len() as u64)
    }

    async fn invoice_count_on(&self, date: NaiveDate) -> StoreResult<i64> {
        let state = self.state.lock().await;
        state.check()?;
        Ok(state.stats(date).invoice_count)
    }

    async fn purge(&self) -> StoreResult<PurgeReport> {
        let mut state = self.state.lock().await;
        state.check()?;
        let report = PurgeReport {
            invoices_deleted: state.invoices.len() as u64,
            summaries_deleted: state.summaries.len() as u64,
        };
        state.invoices.clear();
        state.numbers.clear();
        state.summaries.clear();
        Ok(report)
    }

    async fn health_check(&self) -> bool {
        !self.state.lock().await.unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::{InvoiceNumber, NewInvoice};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn invoice(id: &str, date: NaiveDate, seq: i64, total: i64) -> Invoice {
        let submission = NewInvoice {
            customer_name: "Ana".to_string(),
            customer_phone: "0901".to_string(),
            total_cents: Some(total),
            ..Default::default()
        };
        Invoice::from_submission(
            &submission,
            id.to_string(),
            InvoiceNumber::new(date, seq),
            Utc::now(),
        ).unwrap()
    }

    #[tokio::test]
    async fn test_next_sequence_creates_row_and_counts_up() {
        let store = MemoryStore::new();
        assert_eq!(store.next_sequence(day(14)).await.unwrap(), 1);
        assert_eq!(store.next_sequence(day(14)).await.unwrap(), 2);
        assert_eq!(store.next_sequence(day(15)).await.unwrap(), 1);

        let summary = store.summary(day(14)).await.unwrap().unwrap();
        assert_eq!(summary.last_sequence_number, 2);
        assert_eq!(summary.total_invoices, 0);
    }

    #[tokio::test]
    async fn test_duplicate_number_is_reported_as_conflict() {
        let store = MemoryStore::new();
        store.insert_invoice(&invoice("a", day(14), 1, 100)).await.unwrap();
        let err = store
            .insert_invoice(&invoice("b", day(14), 1, 100))
            .await
            .unwrap_err();
        assert!(err.is_invoice_number_conflict());

        let err = store
            .insert_invoice(&invoice("a", day(14), 2, 100))
            .await
            .unwrap_err();
        assert!(!err.is_invoice_number_conflict());
    }

    #[tokio::test]
    async fn test_list_orders_by_date_then_sequence() {
        let store = MemoryStore::new();
        store.insert_invoice(&invoice("c", day(15), 1, 100)).await.unwrap();
        store.insert_invoice(&invoice("b", day(14), 10, 100)).await.unwrap();
        store.insert_invoice(&invoice("a", day(14), 9, 100)).await.unwrap();

        let range = DateRange::new(day(14), day(15)).unwrap();
        let page = store.list_invoices(range, Page::new(1, 2)).await.unwrap();
        assert_eq!(page.total, 3);
        let ids: Vec<&str> = page.invoices.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let page = store.list_invoices(range, Page::new(2, 2)).await.unwrap();
        assert_eq!(page.invoices.len(), 1);
        assert_eq!(page.invoices[0].id, "c");
    }

    #[tokio::test]
    async fn test_close_day_only_once() {
        let store = MemoryStore::new();
        store.next_sequence(day(14)).await.unwrap();
        let at = Utc::now();
        assert!(store.close_day(day(14), at, Some("ok")).await.unwrap().is_some());
        assert!(store.close_day(day(14), at, None).await.unwrap().is_none());
        assert!(store.close_day(day(20), at, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true).await;
        assert!(matches!(
            store.next_sequence(day(14)).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(!store.health_check().await);
    }

    #[tokio::test]
    async fn test_purge_reports_counts() {
        let store = MemoryStore::new();
        store.next_sequence(day(14)).await.unwrap();
        store.insert_invoice(&invoice("a", day(14), 1, 100)).await.unwrap();
        let report = store.purge().await.unwrap();
        assert_eq!(report.invoices_deleted, 1);
        assert_eq!(report.summaries_deleted, 1);
        assert!(store.summary(day(14)).await.unwrap().is_none());
    }
}

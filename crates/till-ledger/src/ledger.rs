//! # Ledger
//!
//! The write path for invoices: append, edit, delete, print bookkeeping.
//!
//! ## Append Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  append(NewInvoice)                                                    │
//! │     │                                                                   │
//! │     ├── validate_submission()   ── Err → ValidationError (no number)   │
//! │     │                                                                   │
//! │     ├── date = civil_date(clock.now())   captured ONCE per request     │
//! │     │                                                                   │
//! │     ├── guard_open(date)        ── only with enforce_closed_days       │
//! │     │                                                                   │
//! │     │   ┌──────────── attempt 1..=max_allocation_attempts ─────────┐   │
//! │     ├──►│ allocate(date) → insert_invoice()                        │   │
//! │     │   │   Ok                           → done                    │   │
//! │     │   │   invoice_number conflict      → allocate again, retry   │   │
//! │     │   │   anything else                → surfaced                │   │
//! │     │   └──────────────────────────────────────────────────────────┘   │
//! │     │        all attempts collided → AllocationConflict                │
//! │     │                                                                   │
//! │     └── on_appended(date, total, discount)                             │
//! │           failure is logged; the next reconcile repairs the totals     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Edits and Deletes
//! Deletes, bulk day deletes and edits that move money run the reconciler
//! for the invoice's ledger date once the mutation has committed. Cosmetic
//! edits (customer fields, notes, status) and print bookkeeping do not.

use chrono::NaiveDate;
use std::sync::Arc;
use till_core::validation::{validate_invoice, validate_submission};
use till_core::{DateRange, Invoice, InvoiceNumber, InvoicePage, InvoicePatch, NewInvoice, Page};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregates::AggregateUpdater;
use crate::allocator::SequenceAllocator;
use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::reconciler::Reconciler;
use crate::store::{LedgerStore, PurgeReport};

/// Invoice write path over a [`LedgerStore`].
#[derive(Debug)]
pub struct Ledger<S> {
    store: Arc<S>,
    allocator: SequenceAllocator<S>,
    aggregates: AggregateUpdater<S>,
    reconciler: Reconciler<S>,
    clock: Arc<dyn Clock>,
    config: Arc<LedgerConfig>,
}

impl<S> Clone for Ledger<S> {
    fn clone(&self) -> Self {
        Ledger {
            store: Arc::clone(&self.store),
            allocator: self.allocator.clone(),
            aggregates: self.aggregates.clone(),
            reconciler: self.reconciler.clone(),
            clock: Arc::clone(&self.clock),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: Arc<LedgerConfig>) -> Self {
        Ledger {
            allocator: SequenceAllocator::new(Arc::clone(&store)),
            aggregates: AggregateUpdater::new(Arc::clone(&store)),
            reconciler: Reconciler::new(Arc::clone(&store)),
            store,
            clock,
            config,
        }
    }

    // =========================================================================
    // Append
    // =========================================================================

    /// Records a new invoice under today's civil date.
    ///
    /// Returns the stored row with its definitive `invoice_number`.
    pub async fn append(&self, submission: NewInvoice) -> LedgerResult<Invoice> {
        validate_submission(&submission)?;

        let now = self.clock.now();
        let date = self.config.civil_date(now);
        self.guard_open(date).await?;

        let max_attempts = self.config.max_allocation_attempts.max(1);
        let number = self.allocator.allocate(date).await?;
        let mut invoice =
            Invoice::from_submission(&submission, Uuid::new_v4().to_string(), number, now)?;

        let mut attempt = 1;
        loop {
            match self.store.insert_invoice(&invoice).await {
                Ok(()) => break,
                Err(err) if err.is_invoice_number_conflict() => {
                    if attempt >= max_attempts {
                        warn!(
                            %date,
                            attempts = attempt,
                            invoice_number = %invoice.invoice_number,
                            "Giving up on invoice number allocation"
                        );
                        return Err(LedgerError::AllocationConflict {
                            date,
                            attempts: attempt,
                        });
                    }
                    warn!(
                        %date,
                        attempt,
                        invoice_number = %invoice.invoice_number,
                        "Invoice number already taken, allocating again"
                    );
                    attempt += 1;
                    let next = self.allocator.allocate(date).await?;
                    invoice.renumber(next);
                }
                Err(err) => return Err(err.into()),
            }
        }

        if let Err(err) = self
            .aggregates
            .on_appended(date, invoice.total(), invoice.discount())
            .await
        {
            warn!(
                %date,
                invoice_number = %invoice.invoice_number,
                error = %err,
                "Daily totals not updated; reconcile the day to repair"
            );
        }

        info!(
            id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            final_total = %invoice.final_total(),
            "Invoice recorded"
        );
        Ok(invoice)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get(&self, id: &str) -> LedgerResult<Invoice> {
        self.store
            .invoice_by_id(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Invoice", id))
    }

    /// Looks an invoice up by its printed number.
    pub async fn get_by_number(&self, invoice_number: &str) -> LedgerResult<Invoice> {
        let number = InvoiceNumber::parse(invoice_number.trim())?;
        let key = number.to_string();
        self.store
            .invoice_by_number(&key)
            .await?
            .ok_or_else(|| LedgerError::not_found("Invoice", key))
    }

    /// Invoices numbered between `start` and `end` inclusive, ordered by
    /// date then sequence.
    pub async fn list_by_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        page: Page,
    ) -> LedgerResult<InvoicePage> {
        let range = DateRange::new(start, end)?;
        let page = page.clamp_size(self.config.max_page_size);
        Ok(self.store.list_invoices(range, page).await?)
    }

    // =========================================================================
    // Administrative writes
    // =========================================================================

    /// Applies an edit. Edits that move money reconcile the day.
    pub async fn update(&self, id: &str, patch: InvoicePatch) -> LedgerResult<Invoice> {
        let existing = self.get(id).await?;
        if patch.is_empty() {
            return Ok(existing);
        }
        self.guard_open(existing.ledger_date).await?;

        let mut updated = existing;
        patch.apply(&mut updated)?;
        validate_invoice(&updated)?;

        self.store.update_invoice(&updated).await?;
        info!(id, invoice_number = %updated.invoice_number, "Invoice updated");

        if patch.affects_totals() {
            self.reconcile_after(updated.ledger_date, "update").await;
        }
        Ok(updated)
    }

    /// Removes an invoice and reconciles its day. Returns the removed row.
    pub async fn delete(&self, id: &str) -> LedgerResult<Invoice> {
        let existing = self.get(id).await?;
        self.guard_open(existing.ledger_date).await?;

        let removed = self
            .store
            .delete_invoice(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Invoice", id))?;
        info!(id, invoice_number = %removed.invoice_number, "Invoice deleted");

        self.reconcile_after(removed.ledger_date, "delete").await;
        Ok(removed)
    }

    /// Removes every invoice of one ledger date and reconciles it.
    pub async fn delete_day(&self, date: NaiveDate) -> LedgerResult<u64> {
        self.guard_open(date).await?;

        let deleted = self.store.delete_invoices_on(date).await?;
        info!(%date, deleted, "Ledger day deleted");

        self.reconcile_after(date, "delete_day").await;
        Ok(deleted)
    }

    /// Records one trip to the receipt printer.
    ///
    /// Never blocked by a closed day and never moves the day's totals.
    pub async fn record_print(&self, id: &str) -> LedgerResult<Invoice> {
        let invoice = self
            .store
            .record_print(id, self.clock.now())
            .await?
            .ok_or_else(|| LedgerError::not_found("Invoice", id))?;
        debug!(id, print_count = invoice.print_count, "Print recorded");
        Ok(invoice)
    }

    /// Deletes the whole ledger together with every daily summary.
    pub async fn purge(&self) -> LedgerResult<PurgeReport> {
        let report = self.store.purge().await?;
        warn!(
            invoices = report.invoices_deleted,
            summaries = report.summaries_deleted,
            "Ledger purged"
        );
        Ok(report)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Rejects writes to a closed day when the guard is enabled.
    async fn guard_open(&self, date: NaiveDate) -> LedgerResult<()> {
        if !self.config.enforce_closed_days {
            return Ok(());
        }
        match self.store.summary(date).await? {
            Some(summary) if summary.is_closed => Err(LedgerError::DayClosed { date }),
            _ => Ok(()),
        }
    }

    /// Runs the reconciler after a committed mutation.
    ///
    /// The mutation already happened, so a failure here is logged rather than
    /// surfaced; the next explicit reconcile repairs the day.
    async fn reconcile_after(&self, date: NaiveDate, operation: &str) {
        if let Err(err) = self.reconciler.recompute(date).await {
            warn!(%date, operation, error = %err, "Reconcile after ledger change failed");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::{CollisionHook, MemoryState, MemoryStore};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;
    use till_core::{InvoiceItem, InvoiceStatus, ValidationError, MAX_INVOICE_TOTAL_CENTS};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 14, 10, 0, 0).unwrap()))
    }

    fn ledger_with(config: LedgerConfig) -> (Ledger<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::new(store.clone(), clock(), Arc::new(config));
        (ledger, store)
    }

    fn ledger() -> (Ledger<MemoryStore>, Arc<MemoryStore>) {
        ledger_with(LedgerConfig::default())
    }

    fn order(total: i64, discount: i64) -> NewInvoice {
        NewInvoice {
            customer_name: "Ana Lima".to_string(),
            customer_phone: "+92 300 1234567".to_string(),
            items: vec![InvoiceItem {
                game_id: Some("g-1".to_string()),
                title: "Elden Ring".to_string(),
                platform: Some("PS5".to_string()),
                quantity: 1,
                unit_price_cents: total,
            }],
            total_cents: Some(total),
            discount_cents: discount,
            ..Default::default()
        }
    }

    async fn mark(store: &MemoryStore, date: NaiveDate) -> i64 {
        store
            .summary(date)
            .await
            .unwrap()
            .map(|s| s.last_sequence_number)
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_two_appends_number_and_total_the_day() {
        let (ledger, store) = ledger();

        let a = ledger.append(order(10000, 0)).await.unwrap();
        let b = ledger.append(order(5000, 1000)).await.unwrap();
        assert_eq!(a.invoice_number, "20250614-001");
        assert_eq!(b.invoice_number, "20250614-002");
        assert_eq!(b.final_total_cents, 4000);

        let summary = store.summary(day(14)).await.unwrap().unwrap();
        assert_eq!(summary.total_invoices, 2);
        assert_eq!(summary.total_revenue_cents, 15000);
        assert_eq!(summary.total_discount_cents, 1000);
        assert_eq!(summary.net_revenue_cents, 14000);
    }

    #[tokio::test]
    async fn test_delete_reconciles_but_keeps_mark() {
        let (ledger, store) = ledger();
        let a = ledger.append(order(10000, 0)).await.unwrap();
        ledger.append(order(5000, 1000)).await.unwrap();

        let removed = ledger.delete(&a.id).await.unwrap();
        assert_eq!(removed.invoice_number, "20250614-001");

        let summary = store.summary(day(14)).await.unwrap().unwrap();
        assert_eq!(summary.total_invoices, 1);
        assert_eq!(summary.total_revenue_cents, 5000);
        assert_eq!(summary.total_discount_cents, 1000);
        assert_eq!(summary.net_revenue_cents, 4000);
        assert_eq!(summary.last_sequence_number, 2);

        // Deleted numbers are never handed out again.
        let c = ledger.append(order(100, 0)).await.unwrap();
        assert_eq!(c.invoice_number, "20250614-003");
    }

    #[tokio::test]
    async fn test_invalid_submission_does_not_burn_a_number() {
        let (ledger, store) = ledger();
        ledger.append(order(100, 0)).await.unwrap();

        let mut no_name = order(100, 0);
        no_name.customer_name = "   ".to_string();
        let err = ledger.append(no_name).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(ValidationError::Required { .. })));

        let mut no_items = order(100, 0);
        no_items.items.clear();
        assert!(ledger.append(no_items).await.is_err());

        let over_discount = order(100, 500);
        assert!(ledger.append(over_discount).await.is_err());

        assert_eq!(mark(&store, day(14)).await, 1);
    }

    #[tokio::test]
    async fn test_oversized_amounts_are_rejected_before_allocation() {
        let (ledger, store) = ledger();

        let mut overflowing = order(0, 0);
        overflowing.total_cents = None;
        overflowing.items[0].quantity = 2;
        overflowing.items[0].unit_price_cents = i64::MAX / 2 + 1;
        let err = ledger.append(overflowing).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(ValidationError::OutOfRange { .. })));

        let err = ledger.append(order(i64::MAX - 1, 0)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(mark(&store, day(14)).await, 0);

        // Two invoices at the ceiling both land and total the day.
        let a = ledger.append(order(MAX_INVOICE_TOTAL_CENTS, 0)).await.unwrap();
        let b = ledger.append(order(MAX_INVOICE_TOTAL_CENTS, 0)).await.unwrap();
        assert_eq!(a.invoice_number, "20250614-001");
        assert_eq!(b.invoice_number, "20250614-002");
        let summary = store.summary(day(14)).await.unwrap().unwrap();
        assert_eq!(summary.total_revenue_cents, 2 * MAX_INVOICE_TOTAL_CENTS);
    }

    #[tokio::test]
    async fn test_collision_retries_with_a_higher_number() {
        let (ledger, store) = ledger();

        // A rival request takes 002 and inserts it while request 1's first
        // insert is in flight with 001.
        let rival = order(700, 0);
        let hook: CollisionHook = Box::new(move |state: &mut MemoryState| {
            let seq = state.next_sequence(day(14));
            let invoice = Invoice::from_submission(
                &rival,
                "rival".to_string(),
                InvoiceNumber::new(day(14), seq),
                Utc::now(),
            ).unwrap();
            state.insert(invoice).unwrap();
        });
        store.collide_next_insert(Some(hook)).await;

        let first = ledger.append(order(100, 0)).await.unwrap();
        assert_eq!(first.invoice_number, "20250614-003");

        let rival = ledger.get("rival").await.unwrap();
        assert_eq!(rival.invoice_number, "20250614-002");
        assert_ne!(rival.invoice_number, first.invoice_number);
    }

    #[tokio::test]
    async fn test_allocation_conflict_after_bounded_attempts() {
        let (ledger, store) = ledger_with(LedgerConfig::new().max_allocation_attempts(2));
        store.collide_next_insert(None).await;
        store.collide_next_insert(None).await;

        let err = ledger.append(order(100, 0)).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::AllocationConflict {
                date: day(14),
                attempts: 2
            }
        );
        // Both numbers were burned.
        assert_eq!(mark(&store, day(14)).await, 2);
        assert_eq!(store.invoice_count_on(day(14)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_aggregate_failure_still_returns_invoice() {
        let (ledger, store) = ledger();
        store.fail_next_increments(1).await;

        let invoice = ledger.append(order(2500, 0)).await.unwrap();
        assert_eq!(invoice.invoice_number, "20250614-001");

        let stale = store.summary(day(14)).await.unwrap().unwrap();
        assert_eq!(stale.total_invoices, 0);

        let repaired = Reconciler::new(store.clone()).recompute(day(14)).await.unwrap();
        assert_eq!(repaired.total_invoices, 1);
        assert_eq!(repaired.total_revenue_cents, 2500);
    }

    #[tokio::test]
    async fn test_store_unavailable_is_fatal() {
        let (ledger, store) = ledger();
        store.set_unavailable(true).await;
        let err = ledger.append(order(100, 0)).await.unwrap_err();
        assert!(matches!(err, LedgerError::StoreUnavailable(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_get_distinct_numbers() {
        let (ledger, store) = ledger();
        let mut handles = Vec::new();
        for i in 0..50 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.append(order(100 + i, 0)).await.unwrap().invoice_number
            }));
        }

        let mut numbers = HashSet::new();
        for handle in handles {
            assert!(numbers.insert(handle.await.unwrap()));
        }
        assert_eq!(numbers.len(), 50);

        let summary = store.summary(day(14)).await.unwrap().unwrap();
        assert_eq!(summary.total_invoices, 50);
        assert_eq!(summary.last_sequence_number, 50);
    }

    #[tokio::test]
    async fn test_cosmetic_update_skips_reconcile() {
        let (ledger, store) = ledger();
        let invoice = ledger.append(order(1000, 0)).await.unwrap();

        // Plant drift; a cosmetic edit must leave it alone.
        store
            .with_state(|state| {
                let mut summary = state.recompute(day(14));
                summary.total_revenue_cents = 1;
                state.put_summary(summary);
            })
            .await;

        let patch = InvoicePatch {
            notes: Some("gift wrap".to_string()),
            status: Some(InvoiceStatus::Completed),
            ..Default::default()
        };
        let updated = ledger.update(&invoice.id, patch).await.unwrap();
        assert_eq!(updated.status, InvoiceStatus::Completed);
        assert_eq!(store.summary(day(14)).await.unwrap().unwrap().total_revenue_cents, 1);

        let money = InvoicePatch {
            discount_cents: Some(200),
            ..Default::default()
        };
        let updated = ledger.update(&invoice.id, money).await.unwrap();
        assert_eq!(updated.final_total_cents, 800);
        let summary = store.summary(day(14)).await.unwrap().unwrap();
        assert_eq!(summary.total_revenue_cents, 1000);
        assert_eq!(summary.net_revenue_cents, 800);
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_result() {
        let (ledger, _store) = ledger();
        let invoice = ledger.append(order(1000, 0)).await.unwrap();
        let patch = InvoicePatch {
            discount_cents: Some(5000),
            ..Default::default()
        };
        let err = ledger.update(&invoice.id, patch).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(ledger.get(&invoice.id).await.unwrap().discount_cents, 0);
    }

    #[tokio::test]
    async fn test_item_edit_rederives_total_and_reconciles() {
        let (ledger, store) = ledger();
        let invoice = ledger.append(order(1000, 200)).await.unwrap();

        let mut items = invoice.items.clone();
        items[0].quantity = 3;
        let patch = InvoicePatch {
            items: Some(items),
            ..Default::default()
        };
        let updated = ledger.update(&invoice.id, patch).await.unwrap();
        assert_eq!(updated.total_cents, 3000);
        assert_eq!(updated.final_total_cents, 2800);

        let summary = store.summary(day(14)).await.unwrap().unwrap();
        assert_eq!(summary.total_revenue_cents, 3000);
        assert_eq!(summary.net_revenue_cents, 2800);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let (ledger, _store) = ledger();
        assert_eq!(ledger.get("nope").await.unwrap_err().code(), crate::ErrorCode::NotFound);
        assert!(matches!(ledger.delete("nope").await, Err(LedgerError::NotFound { .. })));
        assert!(matches!(
            ledger.get_by_number("20250614-001").await,
            Err(LedgerError::NotFound { .. })
        ));
        assert!(matches!(
            ledger.get_by_number("garbage").await,
            Err(LedgerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_get_by_number_and_list() {
        let (ledger, _store) = ledger();
        let a = ledger.append(order(100, 0)).await.unwrap();
        ledger.append(order(200, 0)).await.unwrap();

        assert_eq!(ledger.get_by_number("20250614-001").await.unwrap(), a);

        let page = ledger
            .list_by_range(day(14), day(14), Page::new(1, 1))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.invoices, vec![a]);

        assert!(ledger
            .list_by_range(day(15), day(14), Page::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_delete_day_reconciles() {
        let (ledger, store) = ledger();
        ledger.append(order(100, 0)).await.unwrap();
        ledger.append(order(200, 0)).await.unwrap();

        assert_eq!(ledger.delete_day(day(14)).await.unwrap(), 2);
        let summary = store.summary(day(14)).await.unwrap().unwrap();
        assert_eq!(summary.total_invoices, 0);
        assert_eq!(summary.total_revenue_cents, 0);
        assert_eq!(summary.last_sequence_number, 2);
    }

    #[tokio::test]
    async fn test_record_print_bumps_count_only() {
        let (ledger, store) = ledger();
        let invoice = ledger.append(order(100, 0)).await.unwrap();

        ledger.record_print(&invoice.id).await.unwrap();
        let printed = ledger.record_print(&invoice.id).await.unwrap();
        assert_eq!(printed.print_count, 2);
        assert_eq!(printed.status, InvoiceStatus::Printed);
        assert!(printed.printed_at.is_some());
        assert_eq!(store.summary(day(14)).await.unwrap().unwrap().total_invoices, 1);
    }

    #[tokio::test]
    async fn test_closed_day_guard_is_opt_in() {
        let (open_ledger, store) = ledger();
        open_ledger.append(order(100, 0)).await.unwrap();
        store.close_day(day(14), Utc::now(), None).await.unwrap();
        // Advisory by default.
        open_ledger.append(order(100, 0)).await.unwrap();

        let guarded = Ledger::new(
            store.clone(),
            clock(),
            Arc::new(LedgerConfig::new().enforce_closed_days(true)),
        );
        let err = guarded.append(order(100, 0)).await.unwrap_err();
        assert_eq!(err, LedgerError::DayClosed { date: day(14) });
        assert_eq!(mark(&store, day(14)).await, 2);

        let first = guarded
            .list_by_range(day(14), day(14), Page::default())
            .await
            .unwrap()
            .invoices
            .remove(0);
        assert!(matches!(
            guarded.delete(&first.id).await,
            Err(LedgerError::DayClosed { .. })
        ));
        // Printing a receipt for a closed day is still allowed.
        guarded.record_print(&first.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_purge_clears_everything() {
        let (ledger, store) = ledger();
        ledger.append(order(100, 0)).await.unwrap();
        let report = ledger.purge().await.unwrap();
        assert_eq!(report.invoices_deleted, 1);
        assert_eq!(report.summaries_deleted, 1);
        assert!(store.summary(day(14)).await.unwrap().is_none());

        // Numbering restarts only after an explicit purge.
        let fresh = ledger.append(order(100, 0)).await.unwrap();
        assert_eq!(fresh.invoice_number, "20250614-001");
    }
}

//! # Reconciler
//!
//! Rebuilds a day's cached totals from the ledger rows.
//!
//! ## Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rows WHERE ledger_date = date                                         │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  LedgerStats { COUNT(*), SUM(total), SUM(discount), MAX(suffix) }      │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  total_invoices  = count                                               │
//! │  total_revenue   = sum(total)                                          │
//! │  total_discount  = sum(discount)                                       │
//! │  net_revenue     = revenue - discount                                  │
//! │  last_sequence   = max(stored mark, max suffix)   ← never decreases    │
//! │  is_closed / closed_at / notes                    ← untouched          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store applies the rule in one atomic step, so a sequence allocated
//! while the recompute runs is never lost. Running it twice without a
//! ledger change yields the same row.

use chrono::NaiveDate;
use std::sync::Arc;
use till_core::{DailySummary, DateRange};
use tracing::{debug, info};

use crate::error::LedgerResult;
use crate::store::LedgerStore;

#[derive(Debug)]
pub struct Reconciler<S> {
    store: Arc<S>,
}

impl<S> Clone for Reconciler<S> {
    fn clone(&self) -> Self {
        Reconciler {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> Reconciler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Reconciler { store }
    }

    /// Overwrites the day's totals with what the ledger actually holds.
    pub async fn recompute(&self, date: NaiveDate) -> LedgerResult<DailySummary> {
        let summary = self.store.recompute_summary(date).await?;
        debug!(
            %date,
            invoices = summary.total_invoices,
            revenue_cents = summary.total_revenue_cents,
            last_sequence = summary.last_sequence_number,
            "Daily summary recomputed"
        );
        Ok(summary)
    }

    /// Recomputes every day in `range`, oldest first.
    pub async fn recompute_range(&self, range: DateRange) -> LedgerResult<Vec<DailySummary>> {
        let mut summaries = Vec::with_capacity(range.len_days().max(0) as usize);
        for date in range.days() {
            summaries.push(self.recompute(date).await?);
        }
        info!(start = %range.start, end = %range.end, days = summaries.len(), "Range recomputed");
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::Utc;
    use till_core::{Invoice, InvoiceNumber, NewInvoice};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn invoice(id: &str, seq: i64, total: i64, discount: i64) -> Invoice {
        let submission = NewInvoice {
            customer_name: "Ana".to_string(),
            customer_phone: "0901".to_string(),
            total_cents: Some(total),
            discount_cents: discount,
            ..Default::default()
        };
        Invoice::from_submission(
            &submission,
            id.to_string(),
            InvoiceNumber::new(day(14), seq),
            Utc::now(),
        ).unwrap()
    }

    #[tokio::test]
    async fn test_recompute_repairs_drifted_cache() {
        let store = Arc::new(MemoryStore::new());
        store.insert_invoice(&invoice("a", 1, 10000, 0)).await.unwrap();
        store.insert_invoice(&invoice("b", 2, 5000, 1000)).await.unwrap();
        store
            .with_state(|state| {
                let mut drifted = DailySummary::empty(day(14));
                drifted.total_invoices = 7;
                drifted.total_revenue_cents = 1;
                drifted.last_sequence_number = 1;
                state.put_summary(drifted);
            })
            .await;

        let summary = Reconciler::new(store).recompute(day(14)).await.unwrap();
        assert_eq!(summary.total_invoices, 2);
        assert_eq!(summary.total_revenue_cents, 15000);
        assert_eq!(summary.total_discount_cents, 1000);
        assert_eq!(summary.net_revenue_cents, 14000);
        // Raised to the largest suffix in use.
        assert_eq!(summary.last_sequence_number, 2);
    }

    #[tokio::test]
    async fn test_recompute_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        store.next_sequence(day(14)).await.unwrap();
        store.insert_invoice(&invoice("a", 1, 10000, 500)).await.unwrap();
        store.close_day(day(14), Utc::now(), Some("z-report")).await.unwrap();
        let reconciler = Reconciler::new(store);

        let first = reconciler.recompute(day(14)).await.unwrap();
        let second = reconciler.recompute(day(14)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_recompute_keeps_close_fields_and_mark() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..5 {
            store.next_sequence(day(14)).await.unwrap();
        }
        store.insert_invoice(&invoice("a", 2, 10000, 0)).await.unwrap();
        let closed = store
            .close_day(day(14), Utc::now(), Some("counted"))
            .await
            .unwrap()
            .unwrap();

        let summary = Reconciler::new(store).recompute(day(14)).await.unwrap();
        assert_eq!(summary.last_sequence_number, 5);
        assert!(summary.is_closed);
        assert_eq!(summary.closed_at, closed.closed_at);
        assert_eq!(summary.notes.as_deref(), Some("counted"));
    }

    #[tokio::test]
    async fn test_recompute_range_materializes_every_day() {
        let store = Arc::new(MemoryStore::new());
        store.insert_invoice(&invoice("a", 1, 10000, 0)).await.unwrap();
        let reconciler = Reconciler::new(store.clone());

        let range = DateRange::new(day(13), day(15)).unwrap();
        let summaries = reconciler.recompute_range(range).await.unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0], DailySummary::empty(day(13)));
        assert_eq!(summaries[1].total_revenue_cents, 10000);
        assert_eq!(store.summaries_between(range).await.unwrap().len(), 3);
    }
}

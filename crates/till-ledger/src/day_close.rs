//! # Day Close
//!
//! One-way OPEN → CLOSED checkpoint for a civil date.
//!
//! ```text
//! ┌──────────┐   close(date, notes)    ┌──────────────────────────┐
//! │   OPEN   │ ──────────────────────► │ CLOSED { at, notes }     │
//! └──────────┘                          └──────────────────────────┘
//!                                          close again → AlreadyClosed
//! ```
//!
//! Closing is a reporting checkpoint. It blocks ledger writes only when
//! [`LedgerConfig::enforce_closed_days`](crate::config::LedgerConfig) is set.

use chrono::NaiveDate;
use std::sync::Arc;
use till_core::{DailySummary, DayState};
use tracing::info;

use crate::clock::Clock;
use crate::error::{LedgerError, LedgerResult};
use crate::reconciler::Reconciler;
use crate::store::LedgerStore;

#[derive(Debug)]
pub struct DayCloseManager<S> {
    store: Arc<S>,
    reconciler: Reconciler<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for DayCloseManager<S> {
    fn clone(&self) -> Self {
        DayCloseManager {
            store: Arc::clone(&self.store),
            reconciler: self.reconciler.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: LedgerStore> DayCloseManager<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        DayCloseManager {
            reconciler: Reconciler::new(Arc::clone(&store)),
            store,
            clock,
        }
    }

    /// Closes `date`, appending `notes` to whatever the day already carries.
    ///
    /// ## Errors
    /// - `AlreadyClosed` when the day is closed (its `closed_at` is kept)
    /// - `NotFound` when the day has neither a summary nor invoices
    pub async fn close(&self, date: NaiveDate, notes: Option<&str>) -> LedgerResult<DailySummary> {
        match self.store.summary(date).await? {
            Some(summary) if summary.is_closed => return Err(LedgerError::AlreadyClosed { date }),
            Some(_) => {}
            None => {
                if self.store.invoice_count_on(date).await? == 0 {
                    return Err(LedgerError::not_found("DailySummary", date.to_string()));
                }
                // Ledger rows without a summary: materialize it first.
                self.reconciler.recompute(date).await?;
            }
        }

        // The conditional update loses only to a concurrent close.
        let closed = self
            .store
            .close_day(date, self.clock.now(), notes)
            .await?
            .ok_or(LedgerError::AlreadyClosed { date })?;

        info!(
            %date,
            invoices = closed.total_invoices,
            net_revenue_cents = closed.net_revenue_cents,
            "Day closed"
        );
        Ok(closed)
    }

    pub async fn state(&self, date: NaiveDate) -> LedgerResult<DayState> {
        Ok(self
            .store
            .summary(date)
            .await?
            .map(|summary| summary.state())
            .unwrap_or(DayState::Open))
    }
}

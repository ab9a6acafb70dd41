//! # Aggregate Updater
//!
//! Folds one successful append into the day's cached totals.
//!
//! The whole change is a single store call (`increment_summary`), which each
//! backend executes as one atomic statement. There is no read-modify-write
//! here, so concurrent appends cannot lose an increment.

use chrono::NaiveDate;
use std::sync::Arc;
use till_core::Money;
use tracing::debug;

use crate::error::LedgerResult;
use crate::store::LedgerStore;

#[derive(Debug)]
pub struct AggregateUpdater<S> {
    store: Arc<S>,
}

impl<S> Clone for AggregateUpdater<S> {
    fn clone(&self) -> Self {
        AggregateUpdater {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> AggregateUpdater<S> {
    pub fn new(store: Arc<S>) -> Self {
        AggregateUpdater { store }
    }

    /// `total_invoices += 1`, revenue/discount/net by the invoice's amounts.
    pub async fn on_appended(
        &self,
        date: NaiveDate,
        total: Money,
        discount: Money,
    ) -> LedgerResult<()> {
        self.store.increment_summary(date, total, discount).await?;
        debug!(%date, %total, %discount, "Daily totals incremented");
        Ok(())
    }
}

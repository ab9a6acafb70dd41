//! # Range Reporter
//!
//! Read-only views over the daily summaries.
//!
//! ```text
//! get_summary(d)        → DailySummary (empty + open when never touched)
//! get_range(s, e)       → RangeReport { one entry per day, totals }
//! export_csv(s, e)      → BOM + header + one CRLF row per day
//! ```

use chrono::NaiveDate;
use std::sync::Arc;
use till_core::export::summaries_to_csv;
use till_core::{DailySummary, DateRange, RangeReport, ValidationError};
use tracing::debug;

use crate::config::LedgerConfig;
use crate::error::LedgerResult;
use crate::store::LedgerStore;

#[derive(Debug)]
pub struct RangeReporter<S> {
    store: Arc<S>,
    config: Arc<LedgerConfig>,
}

impl<S> Clone for RangeReporter<S> {
    fn clone(&self) -> Self {
        RangeReporter {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: LedgerStore> RangeReporter<S> {
    pub fn new(store: Arc<S>, config: Arc<LedgerConfig>) -> Self {
        RangeReporter { store, config }
    }

    pub async fn get_summary(&self, date: NaiveDate) -> LedgerResult<DailySummary> {
        Ok(self
            .store
            .summary(date)
            .await?
            .unwrap_or_else(|| DailySummary::empty(date)))
    }

    /// Dense report over `start..=end`.
    pub async fn get_range(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<RangeReport> {
        let range = self.range(start, end)?;
        let stored = self.store.summaries_between(range).await?;
        debug!(%start, %end, stored = stored.len(), "Range report built");
        Ok(RangeReport::dense(range, stored))
    }

    /// CSV of the same rows [`get_range`](Self::get_range) returns.
    pub async fn export_csv(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Vec<u8>> {
        let report = self.get_range(start, end).await?;
        Ok(summaries_to_csv(&report.days)?)
    }

    fn range(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<DateRange> {
        let range = DateRange::new(start, end)?;
        if range.len_days() > self.config.max_range_days {
            return Err(ValidationError::OutOfRange {
                field: "range_days".to_string(),
                min: 1,
                max: self.config.max_range_days,
            }
            .into());
        }
        Ok(range)
    }
}

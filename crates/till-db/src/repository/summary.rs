//! # Daily Summary Repository
//!
//! One row per ledger date. Holds the sequence counter and the cached
//! totals.
//!
//! ## Why Single Statements
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Read-then-write vs. upsert under concurrency               │
//! │                                                                         │
//! │  ❌ SELECT last → +1 in Rust → UPDATE                                   │
//! │     Two tills read 4, both write 5, both print -005                    │
//! │                                                                         │
//! │  ✅ INSERT .. ON CONFLICT DO UPDATE SET n = n + 1 RETURNING n           │
//! │     SQLite serializes writers; each caller sees its own value          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation below is one statement, so none of them needs an explicit
//! transaction and none of them can interleave with another.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use till_core::DailySummary;
use tracing::debug;

use crate::error::DbResult;

macro_rules! returning_summary {
    ($head:literal) => {
        concat!(
            $head,
            " RETURNING date, last_sequence_number, total_invoices, total_revenue_cents, ",
            "total_discount_cents, net_revenue_cents, is_closed, closed_at, notes"
        )
    };
}

/// Repository for daily summary rows.
#[derive(Debug, Clone)]
pub struct SummaryRepository {
    pool: SqlitePool,
}

impl SummaryRepository {
    /// Creates a new SummaryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SummaryRepository { pool }
    }

    /// Advances the day's counter and returns the new value. The first call
    /// for a date creates the row with `1`.
    pub async fn next_sequence(&self, date: NaiveDate) -> DbResult<i64> {
        let next: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO daily_summaries (date, last_sequence_number)
            VALUES (?1, 1)
            ON CONFLICT(date) DO UPDATE SET
                last_sequence_number = last_sequence_number + 1
            RETURNING last_sequence_number
            "#,
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        debug!(%date, sequence = next, "Sequence advanced");
        Ok(next)
    }

    /// Adds one invoice to the cached totals. Does not touch the counter.
    pub async fn increment(
        &self,
        date: NaiveDate,
        total_cents: i64,
        discount_cents: i64,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_summaries (
                date, total_invoices, total_revenue_cents,
                total_discount_cents, net_revenue_cents
            ) VALUES (?1, 1, ?2, ?3, ?2 - ?3)
            ON CONFLICT(date) DO UPDATE SET
                total_invoices = total_invoices + 1,
                total_revenue_cents = total_revenue_cents + excluded.total_revenue_cents,
                total_discount_cents = total_discount_cents + excluded.total_discount_cents,
                net_revenue_cents = net_revenue_cents + excluded.net_revenue_cents
            "#,
        )
        .bind(date)
        .bind(total_cents)
        .bind(discount_cents)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Rebuilds the day's totals from the invoices table.
    ///
    /// The counter becomes `max(stored, highest suffix on file)`, so it never
    /// moves backwards. Close fields and notes are left as they are.
    pub async fn recompute(&self, date: NaiveDate) -> DbResult<DailySummary> {
        let summary: DailySummary = sqlx::query_as(returning_summary!(
            r#"
            INSERT INTO daily_summaries (
                date, last_sequence_number, total_invoices,
                total_revenue_cents, total_discount_cents, net_revenue_cents
            )
            SELECT
                ?1,
                COALESCE(MAX(CAST(SUBSTR(invoice_number, 10) AS INTEGER)), 0),
                COUNT(*),
                COALESCE(SUM(total_cents), 0),
                COALESCE(SUM(discount_cents), 0),
                COALESCE(SUM(total_cents), 0) - COALESCE(SUM(discount_cents), 0)
            FROM invoices
            WHERE ledger_date = ?1
            ON CONFLICT(date) DO UPDATE SET
                last_sequence_number = MAX(daily_summaries.last_sequence_number,
                                           excluded.last_sequence_number),
                total_invoices = excluded.total_invoices,
                total_revenue_cents = excluded.total_revenue_cents,
                total_discount_cents = excluded.total_discount_cents,
                net_revenue_cents = excluded.net_revenue_cents
            "#
        ))
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        debug!(
            %date,
            invoices = summary.total_invoices,
            net_cents = summary.net_revenue_cents,
            "Summary recomputed"
        );
        Ok(summary)
    }

    /// Gets the summary row for a date.
    pub async fn get(&self, date: NaiveDate) -> DbResult<Option<DailySummary>> {
        let summary = sqlx::query_as(
            r#"
            SELECT date, last_sequence_number, total_invoices, total_revenue_cents,
                   total_discount_cents, net_revenue_cents, is_closed, closed_at, notes
            FROM daily_summaries
            WHERE date = ?1
            "#,
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Stored rows with `start <= date <= end`, ascending. Days without a
    /// row are simply absent.
    pub async fn between(&self, start: NaiveDate, end: NaiveDate) -> DbResult<Vec<DailySummary>> {
        let rows = sqlx::query_as(
            r#"
            SELECT date, last_sequence_number, total_invoices, total_revenue_cents,
                   total_discount_cents, net_revenue_cents, is_closed, closed_at, notes
            FROM daily_summaries
            WHERE date BETWEEN ?1 AND ?2
            ORDER BY date
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Marks an open day closed and merges the notes.
    ///
    /// Returns `None` when there is no row or the day was already closed;
    /// the conditional `WHERE is_closed = 0` means only one of two racing
    /// closers gets a row back.
    pub async fn close(
        &self,
        date: NaiveDate,
        at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> DbResult<Option<DailySummary>> {
        let summary = sqlx::query_as(returning_summary!(
            r#"
            UPDATE daily_summaries SET
                is_closed = 1,
                closed_at = ?2,
                notes = CASE
                    WHEN ?3 IS NULL THEN notes
                    WHEN notes IS NULL OR notes = '' THEN ?3
                    ELSE notes || char(10) || ?3
                END
            WHERE date = ?1 AND is_closed = 0
            "#
        ))
        .bind(date)
        .bind(at)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?;

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    async fn repo() -> SummaryRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().summaries()
    }

    #[tokio::test]
    async fn test_next_sequence_starts_at_one() {
        let repo = repo().await;
        assert_eq!(repo.next_sequence(day(14)).await.unwrap(), 1);
        assert_eq!(repo.next_sequence(day(14)).await.unwrap(), 2);
        assert_eq!(repo.next_sequence(day(15)).await.unwrap(), 1);

        let row = repo.get(day(14)).await.unwrap().unwrap();
        assert_eq!(row.last_sequence_number, 2);
        assert_eq!(row.total_invoices, 0);
        assert!(!row.is_closed);
    }

    #[tokio::test]
    async fn test_increment_keeps_counter() {
        let repo = repo().await;
        repo.next_sequence(day(14)).await.unwrap();
        repo.increment(day(14), 10_000, 1_000).await.unwrap();
        repo.increment(day(14), 5_000, 0).await.unwrap();

        let row = repo.get(day(14)).await.unwrap().unwrap();
        assert_eq!(row.last_sequence_number, 1);
        assert_eq!(row.total_invoices, 2);
        assert_eq!(row.total_revenue_cents, 15_000);
        assert_eq!(row.total_discount_cents, 1_000);
        assert_eq!(row.net_revenue_cents, 14_000);
    }

    #[tokio::test]
    async fn test_recompute_on_empty_day_keeps_counter() {
        let repo = repo().await;
        repo.next_sequence(day(14)).await.unwrap();
        repo.next_sequence(day(14)).await.unwrap();
        repo.increment(day(14), 700, 0).await.unwrap();

        let row = repo.recompute(day(14)).await.unwrap();
        assert_eq!(row.last_sequence_number, 2);
        assert_eq!(row.total_invoices, 0);
        assert_eq!(row.net_revenue_cents, 0);

        let fresh = repo.recompute(day(20)).await.unwrap();
        assert_eq!(fresh.last_sequence_number, 0);
        assert_eq!(fresh.total_invoices, 0);
    }

    #[tokio::test]
    async fn test_close_once_and_merge_notes() {
        let repo = repo().await;
        assert!(repo.close(day(14), Utc::now(), Some("x")).await.unwrap().is_none());

        repo.next_sequence(day(14)).await.unwrap();
        let closed = repo
            .close(day(14), Utc::now(), Some("cash counted"))
            .await
            .unwrap()
            .unwrap();
        assert!(closed.is_closed);
        assert!(closed.closed_at.is_some());
        assert_eq!(closed.notes.as_deref(), Some("cash counted"));

        assert!(repo.close(day(14), Utc::now(), Some("again")).await.unwrap().is_none());
        let row = repo.get(day(14)).await.unwrap().unwrap();
        assert_eq!(row.notes.as_deref(), Some("cash counted"));
    }

    #[tokio::test]
    async fn test_between_is_sparse_and_ordered() {
        let repo = repo().await;
        repo.next_sequence(day(16)).await.unwrap();
        repo.next_sequence(day(14)).await.unwrap();
        repo.next_sequence(day(30)).await.unwrap();

        let rows = repo.between(day(14), day(20)).await.unwrap();
        let dates: Vec<NaiveDate> = rows.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![day(14), day(16)]);
    }
}

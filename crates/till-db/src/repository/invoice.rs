//! # Invoice Repository
//!
//! Database operations for ledger rows.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Invoice Lifecycle                                 │
//! │                                                                         │
//! │  1. INSERT                                                             │
//! │     └── insert() → UNIQUE(invoice_number) guards the number            │
//! │                                                                         │
//! │  2. PRINT (any number of times)                                        │
//! │     └── record_print() → print_count + 1, pending → printed            │
//! │                                                                         │
//! │  3. (OPTIONAL) EDIT                                                    │
//! │     └── update_fields() → customer, notes, items, amounts, status      │
//! │                                                                         │
//! │  4. (OPTIONAL) DELETE                                                  │
//! │     └── delete() / delete_on() → reconciler runs afterwards            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Items are stored as a JSON array in the `items` column.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use till_core::{Invoice, InvoiceItem, InvoiceStatus};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// `SELECT <all invoice columns> FROM invoices <tail>`
macro_rules! select_invoices {
    ($tail:literal) => {
        concat!(
            "SELECT id, invoice_number, ledger_date, customer_name, customer_phone, ",
            "customer_address, notes, items, total_cents, discount_cents, final_total_cents, ",
            "status, created_at, printed_at, print_count FROM invoices ",
            $tail
        )
    };
}

/// `RETURNING <all invoice columns>` appended to a write.
macro_rules! returning_invoice {
    ($head:literal) => {
        concat!(
            $head,
            " RETURNING id, invoice_number, ledger_date, customer_name, customer_phone, ",
            "customer_address, notes, items, total_cents, discount_cents, final_total_cents, ",
            "status, created_at, printed_at, print_count"
        )
    };
}

/// Ordering by date, then numeric suffix, so `-1000` sorts after `-999`.
macro_rules! ledger_order {
    () => {
        "ORDER BY ledger_date, CAST(SUBSTR(invoice_number, 10) AS INTEGER), invoice_number"
    };
}

/// A raw `invoices` row. `items` is still JSON text.
#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    invoice_number: String,
    ledger_date: NaiveDate,
    customer_name: String,
    customer_phone: String,
    customer_address: Option<String>,
    notes: Option<String>,
    items: String,
    total_cents: i64,
    discount_cents: i64,
    final_total_cents: i64,
    status: InvoiceStatus,
    created_at: DateTime<Utc>,
    printed_at: Option<DateTime<Utc>>,
    print_count: i64,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DbError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        let items: Vec<InvoiceItem> = serde_json::from_str(&row.items)
            .map_err(|e| DbError::Corrupt(format!("invoice {} items: {}", row.id, e)))?;
        Ok(Invoice {
            id: row.id,
            invoice_number: row.invoice_number,
            ledger_date: row.ledger_date,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_address: row.customer_address,
            notes: row.notes,
            items,
            total_cents: row.total_cents,
            discount_cents: row.discount_cents,
            final_total_cents: row.final_total_cents,
            status: row.status,
            created_at: row.created_at,
            printed_at: row.printed_at,
            print_count: row.print_count,
        })
    }
}

fn items_json(invoice: &Invoice) -> DbResult<String> {
    serde_json::to_string(&invoice.items).map_err(|e| DbError::Internal(e.to_string()))
}

fn decode_all(rows: Vec<InvoiceRow>) -> DbResult<Vec<Invoice>> {
    rows.into_iter().map(Invoice::try_from).collect()
}

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Inserts a ledger row.
    ///
    /// A taken number fails with `UniqueViolation { field:
    /// "invoices.invoice_number" }`.
    pub async fn insert(&self, invoice: &Invoice) -> DbResult<()> {
        debug!(id = %invoice.id, invoice_number = %invoice.invoice_number, "Inserting invoice");

        let items = items_json(invoice)?;
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, ledger_date,
                customer_name, customer_phone, customer_address, notes, items,
                total_cents, discount_cents, final_total_cents,
                status, created_at, printed_at, print_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(invoice.ledger_date)
        .bind(&invoice.customer_name)
        .bind(&invoice.customer_phone)
        .bind(&invoice.customer_address)
        .bind(&invoice.notes)
        .bind(items)
        .bind(invoice.total_cents)
        .bind(invoice.discount_cents)
        .bind(invoice.final_total_cents)
        .bind(invoice.status)
        .bind(invoice.created_at)
        .bind(invoice.printed_at)
        .bind(invoice.print_count)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                value: if field.contains("invoice_number") {
                    invoice.invoice_number.clone()
                } else {
                    invoice.id.clone()
                },
                field,
            },
            other => other,
        })?;

        Ok(())
    }

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let row: Option<InvoiceRow> = sqlx::query_as(select_invoices!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Invoice::try_from).transpose()
    }

    /// Gets an invoice by its printed number.
    pub async fn get_by_number(&self, invoice_number: &str) -> DbResult<Option<Invoice>> {
        let row: Option<InvoiceRow> =
            sqlx::query_as(select_invoices!("WHERE invoice_number = ?1"))
                .bind(invoice_number)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Invoice::try_from).transpose()
    }

    /// One page of invoices with `start <= ledger_date <= end`.
    pub async fn list_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(select_invoices!(
            "WHERE ledger_date BETWEEN ?1 AND ?2 ORDER BY ledger_date, CAST(SUBSTR(invoice_number, 10) AS INTEGER), invoice_number LIMIT ?3 OFFSET ?4"
        ))
        .bind(start)
        .bind(end)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        decode_all(rows)
    }

    /// Counts invoices with `start <= ledger_date <= end`.
    pub async fn count_between(&self, start: NaiveDate, end: NaiveDate) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE ledger_date BETWEEN ?1 AND ?2")
                .bind(start)
                .bind(end)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Every invoice of one ledger date, in number order.
    pub async fn list_on(&self, date: NaiveDate) -> DbResult<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(concat!(
            select_invoices!("WHERE ledger_date = ?1 "),
            ledger_order!()
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        decode_all(rows)
    }

    /// Counts invoices of one ledger date.
    pub async fn count_on(&self, date: NaiveDate) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE ledger_date = ?1")
            .bind(date)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Writes the editable business fields. Identity and print bookkeeping
    /// are left alone.
    pub async fn update_fields(&self, invoice: &Invoice) -> DbResult<()> {
        debug!(id = %invoice.id, "Updating invoice");

        let items = items_json(invoice)?;
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                customer_name = ?2,
                customer_phone = ?3,
                customer_address = ?4,
                notes = ?5,
                items = ?6,
                total_cents = ?7,
                discount_cents = ?8,
                final_total_cents = ?9,
                status = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.customer_name)
        .bind(&invoice.customer_phone)
        .bind(&invoice.customer_address)
        .bind(&invoice.notes)
        .bind(items)
        .bind(invoice.total_cents)
        .bind(invoice.discount_cents)
        .bind(invoice.final_total_cents)
        .bind(invoice.status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", invoice.id.as_str()));
        }
        Ok(())
    }

    /// Counts one print in a single statement and returns the updated row.
    pub async fn record_print(&self, id: &str, at: DateTime<Utc>) -> DbResult<Option<Invoice>> {
        let row: Option<InvoiceRow> = sqlx::query_as(returning_invoice!(
            r#"
            UPDATE invoices SET
                print_count = print_count + 1,
                printed_at = ?2,
                status = CASE WHEN status = 'pending' THEN 'printed' ELSE status END
            WHERE id = ?1
            "#
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Invoice::try_from).transpose()
    }

    /// Deletes one invoice and returns it.
    pub async fn delete(&self, id: &str) -> DbResult<Option<Invoice>> {
        debug!(id, "Deleting invoice");

        let row: Option<InvoiceRow> =
            sqlx::query_as(returning_invoice!("DELETE FROM invoices WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Invoice::try_from).transpose()
    }

    /// Deletes every invoice of one ledger date.
    pub async fn delete_on(&self, date: NaiveDate) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM invoices WHERE ledger_date = ?1")
            .bind(date)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

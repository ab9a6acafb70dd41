//! # Domain Types
//!
//! Core domain types used throughout the Till POS ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Invoice      │   │  DailySummary   │   │   RangeReport   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  date (PK)      │   │  start / end    │       │
//! │  │  invoice_number │   │  last_sequence  │   │  days[]         │       │
//! │  │  ledger_date    │──►│  totals (cache) │──►│  totals         │       │
//! │  │  items[]        │   │  is_closed      │   └─────────────────┘       │
//! │  │  total/discount │   └─────────────────┘                              │
//! │  └─────────────────┘            ▲                                       │
//! │                                 │ reconciled from                        │
//! │                        ┌────────┴────────┐                              │
//! │                        │   LedgerStats   │  COUNT / SUM / MAX(suffix)   │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every invoice has:
//! - `id`: UUID v4 - immutable, used for edits and deletes
//! - `invoice_number`: `{YYYYMMDD}-{NNN}` - human-readable, printed on receipts

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::invoice_number::{sequence_suffix, InvoiceNumber};
use crate::money::Money;
use crate::validation::ValidationResult;
use crate::MAX_INVOICE_TOTAL_CENTS;

// =============================================================================
// Invoice Status
// =============================================================================

/// Lifecycle status of an invoice.
///
/// Status is informational. Every row in the ledger counts toward the
/// day's revenue regardless of status; removing revenue means deleting
/// (or editing) the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Recorded, not yet printed.
    #[default]
    Pending,
    /// Sent to the receipt printer at least once.
    Printed,
    /// Handed over / paid.
    Completed,
    /// Marked cancelled by an administrator.
    Cancelled,
}

// =============================================================================
// Invoice Item
// =============================================================================

/// A line on an invoice. Snapshot of the catalog entry at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceItem {
    /// Catalog id, if the item came from the game catalog.
    #[serde(default)]
    pub game_id: Option<String>,
    /// Title at time of sale (frozen).
    pub title: String,
    /// Platform label (e.g. "PS5"), if any.
    #[serde(default)]
    pub platform: Option<String>,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
}

impl InvoiceItem {
    /// Returns unit price × quantity, or `None` if it does not fit in i64.
    pub fn line_total(&self) -> Option<Money> {
        Money::from_cents(self.unit_price_cents).checked_multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A row in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    /// Civil date the number was allocated for. Buckets the row for
    /// numbering and for every daily aggregate.
    #[ts(as = "String")]
    pub ledger_date: NaiveDate,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<InvoiceItem>,
    pub total_cents: i64,
    pub discount_cents: i64,
    /// Always `total_cents - discount_cents`.
    pub final_total_cents: i64,
    pub status: InvoiceStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub printed_at: Option<DateTime<Utc>>,
    pub print_count: i64,
}

impl Invoice {
    /// Builds the ledger row for a validated submission.
    ///
    /// The number is the only part that changes between insert attempts;
    /// see [`Invoice::renumber`].
    pub fn from_submission(
        submission: &NewInvoice,
        id: String,
        number: InvoiceNumber,
        now: DateTime<Utc>,
    ) -> ValidationResult<Self> {
        let total = submission.resolved_total()?;
        let discount = Money::from_cents(submission.discount_cents);
        Ok(Invoice {
            id,
            invoice_number: number.to_string(),
            ledger_date: number.date(),
            customer_name: submission.customer_name.trim().to_string(),
            customer_phone: submission.customer_phone.trim().to_string(),
            customer_address: submission.customer_address.clone(),
            notes: submission.notes.clone(),
            items: submission.items.clone(),
            total_cents: total.cents(),
            discount_cents: discount.cents(),
            final_total_cents: total.saturating_sub(discount).cents(),
            status: InvoiceStatus::Pending,
            created_at: now,
            printed_at: None,
            print_count: 0,
        })
    }

    /// Swaps in a freshly allocated number after a collision.
    pub fn renumber(&mut self, number: InvoiceNumber) {
        self.invoice_number = number.to_string();
        self.ledger_date = number.date();
    }

    /// Parses the stored number.
    pub fn number(&self) -> Option<InvoiceNumber> {
        InvoiceNumber::parse(&self.invoice_number).ok()
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn final_total(&self) -> Money {
        Money::from_cents(self.final_total_cents)
    }

    /// Records one trip to the receipt printer.
    pub fn mark_printed(&mut self, now: DateTime<Utc>) {
        self.print_count += 1;
        self.printed_at = Some(now);
        if self.status == InvoiceStatus::Pending {
            self.status = InvoiceStatus::Printed;
        }
    }
}

// =============================================================================
// Submissions and Edits
// =============================================================================

/// What the order-submission endpoint sends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInvoice {
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default)]
    pub customer_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<InvoiceItem>,
    /// Explicit total. When absent the item subtotal is used.
    #[serde(default)]
    pub total_cents: Option<i64>,
    #[serde(default)]
    pub discount_cents: i64,
}

impl NewInvoice {
    /// Sum of item line totals.
    pub fn items_subtotal(&self) -> ValidationResult<Money> {
        items_subtotal(&self.items)
    }

    /// The total that will be recorded.
    pub fn resolved_total(&self) -> ValidationResult<Money> {
        match self.total_cents {
            Some(cents) => Ok(Money::from_cents(cents)),
            None => self.items_subtotal(),
        }
    }
}

/// Sums line totals, failing instead of wrapping when they do not fit.
pub fn items_subtotal(items: &[InvoiceItem]) -> ValidationResult<Money> {
    items
        .iter()
        .try_fold(Money::zero(), |acc, item| {
            item.line_total().and_then(|line| acc.checked_add(line))
        })
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "total".to_string(),
            min: 0,
            max: MAX_INVOICE_TOTAL_CENTS,
        })
}

/// An administrative edit. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoicePatch {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customer_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<InvoiceItem>>,
    #[serde(default)]
    pub total_cents: Option<i64>,
    #[serde(default)]
    pub discount_cents: Option<i64>,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

impl InvoicePatch {
    /// True when the edit can move the day's aggregates.
    pub fn affects_totals(&self) -> bool {
        self.items.is_some() || self.total_cents.is_some() || self.discount_cents.is_some()
    }

    /// True when nothing would change.
    pub fn is_empty(&self) -> bool {
        self.customer_name.is_none()
            && self.customer_phone.is_none()
            && self.customer_address.is_none()
            && self.notes.is_none()
            && self.status.is_none()
            && !self.affects_totals()
    }

    /// Applies the edit, keeping `final_total_cents` consistent.
    ///
    /// New items without an explicit total re-derive the total from the
    /// items, the same way a submission does.
    pub fn apply(&self, invoice: &mut Invoice) -> ValidationResult<()> {
        if let Some(name) = &self.customer_name {
            invoice.customer_name = name.trim().to_string();
        }
        if let Some(phone) = &self.customer_phone {
            invoice.customer_phone = phone.trim().to_string();
        }
        if let Some(address) = &self.customer_address {
            invoice.customer_address = Some(address.clone());
        }
        if let Some(notes) = &self.notes {
            invoice.notes = Some(notes.clone());
        }
        if let Some(items) = &self.items {
            invoice.items = items.clone();
        }
        match (self.total_cents, &self.items) {
            (Some(total), _) => invoice.total_cents = total,
            (None, Some(items)) => invoice.total_cents = items_subtotal(items)?.cents(),
            (None, None) => {}
        }
        if let Some(discount) = self.discount_cents {
            invoice.discount_cents = discount;
        }
        if let Some(status) = self.status {
            invoice.status = status;
        }
        invoice.final_total_cents = invoice.total().saturating_sub(invoice.discount()).cents();
        Ok(())
    }
}

// =============================================================================
// Daily Summary
// =============================================================================

/// Reporting state of a civil day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DayState {
    Open,
    Closed {
        at: DateTime<Utc>,
        notes: Option<String>,
    },
}

impl DayState {
    pub fn is_closed(&self) -> bool {
        matches!(self, DayState::Closed { .. })
    }
}

/// Cached per-day rollup of the ledger plus the day's numbering high-water mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DailySummary {
    #[ts(as = "String")]
    pub date: NaiveDate,
    /// Highest sequence ever handed out for `date`. Never decreases.
    pub last_sequence_number: i64,
    pub total_invoices: i64,
    pub total_revenue_cents: i64,
    pub total_discount_cents: i64,
    pub net_revenue_cents: i64,
    pub is_closed: bool,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl DailySummary {
    /// An open day with nothing recorded.
    pub fn empty(date: NaiveDate) -> Self {
        DailySummary {
            date,
            last_sequence_number: 0,
            total_invoices: 0,
            total_revenue_cents: 0,
            total_discount_cents: 0,
            net_revenue_cents: 0,
            is_closed: false,
            closed_at: None,
            notes: None,
        }
    }

    pub fn state(&self) -> DayState {
        match (self.is_closed, self.closed_at) {
            (true, Some(at)) => DayState::Closed {
                at,
                notes: self.notes.clone(),
            },
            // A closed flag without a timestamp only comes from hand-edited
            // rows; treat the epoch as the close time rather than reopening.
            (true, None) => DayState::Closed {
                at: DateTime::<Utc>::UNIX_EPOCH,
                notes: self.notes.clone(),
            },
            (false, _) => DayState::Open,
        }
    }

    /// Applies one successful append to the cached totals.
    pub fn record_append(&mut self, total: Money, discount: Money) {
        let net = total.saturating_sub(discount);
        self.total_invoices += 1;
        self.total_revenue_cents = self.total_revenue_cents.saturating_add(total.cents());
        self.total_discount_cents = self.total_discount_cents.saturating_add(discount.cents());
        self.net_revenue_cents = self.net_revenue_cents.saturating_add(net.cents());
    }

    /// The reconciliation rule.
    ///
    /// Totals are overwritten from `stats`. The high-water mark is the larger
    /// of the stored mark and the largest suffix still in the ledger, so a
    /// number in use is never handed out again and a burned one is never
    /// reused. Day-close fields are carried over untouched.
    pub fn reconciled(date: NaiveDate, existing: Option<&DailySummary>, stats: &LedgerStats) -> Self {
        let base = existing.cloned().unwrap_or_else(|| DailySummary::empty(date));
        DailySummary {
            date,
            last_sequence_number: base.last_sequence_number.max(stats.max_sequence),
            total_invoices: stats.invoice_count,
            total_revenue_cents: stats.revenue_cents,
            total_discount_cents: stats.discount_cents,
            net_revenue_cents: stats.revenue_cents.saturating_sub(stats.discount_cents),
            is_closed: base.is_closed,
            closed_at: base.closed_at,
            notes: base.notes,
        }
    }
}

/// Merges close-time notes into whatever the day already carries.
///
/// New notes go on a new line after existing ones; `None` keeps the old value.
pub fn merge_notes(existing: Option<&str>, incoming: Option<&str>) -> Option<String> {
    match (existing, incoming) {
        (_, None) => existing.map(str::to_string),
        (None, Some(new)) => Some(new.to_string()),
        (Some(old), Some(new)) if old.is_empty() => Some(new.to_string()),
        (Some(old), Some(new)) => Some(format!("{}\n{}", old, new)),
    }
}

// =============================================================================
// Ledger Statistics
// =============================================================================

/// COUNT / SUM / MAX(suffix) over one day's ledger rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerStats {
    pub invoice_count: i64,
    pub revenue_cents: i64,
    pub discount_cents: i64,
    pub max_sequence: i64,
}

impl LedgerStats {
    pub fn from_invoices<'a>(invoices: impl IntoIterator<Item = &'a Invoice>) -> Self {
        invoices
            .into_iter()
            .fold(LedgerStats::default(), |mut stats, invoice| {
                stats.invoice_count += 1;
                stats.revenue_cents = stats.revenue_cents.saturating_add(invoice.total_cents);
                stats.discount_cents = stats.discount_cents.saturating_add(invoice.discount_cents);
                if let Some(seq) = sequence_suffix(&invoice.invoice_number) {
                    stats.max_sequence = stats.max_sequence.max(seq);
                }
                stats
            })
    }
}

// =============================================================================
// Ranges and Paging
// =============================================================================

/// An inclusive range of civil dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(DateRange { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        DateRange {
            start: date,
            end: date,
        }
    }

    /// Number of calendar days, counting both ends.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every date in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let mut next = Some(self.start);
        std::iter::from_fn(move || {
            let current = next?;
            next = if current < self.end {
                current.checked_add_days(Days::new(1))
            } else {
                None
            };
            Some(current)
        })
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Self {
        Page {
            number: number.max(1),
            size: size.max(1),
        }
    }

    /// Rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.number.saturating_sub(1)) * u64::from(self.size)
    }

    pub fn clamp_size(self, max: u32) -> Self {
        Page::new(self.number, self.size.min(max.max(1)))
    }
}

impl Default for Page {
    fn default() -> Self {
        Page { number: 1, size: 50 }
    }
}

/// One page of invoices plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePage {
    pub invoices: Vec<Invoice>,
    pub page: Page,
    pub total: u64,
}

// =============================================================================
// Range Report
// =============================================================================

/// Sums across a range of daily summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RangeTotals {
    pub days: i64,
    pub closed_days: i64,
    pub total_invoices: i64,
    pub total_revenue_cents: i64,
    pub total_discount_cents: i64,
    pub net_revenue_cents: i64,
}

impl RangeTotals {
    pub fn from_days(days: &[DailySummary]) -> Self {
        days.iter().fold(RangeTotals::default(), |mut totals, day| {
            totals.days += 1;
            if day.is_closed {
                totals.closed_days += 1;
            }
            totals.total_invoices += day.total_invoices;
            totals.total_revenue_cents += day.total_revenue_cents;
            totals.total_discount_cents += day.total_discount_cents;
            totals.net_revenue_cents += day.net_revenue_cents;
            totals
        })
    }
}

/// Dense per-day report over an inclusive range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<DailySummary>,
    pub totals: RangeTotals,
}

impl RangeReport {
    /// Builds a report with one entry per day, filling days the store has
    /// no row for with empty summaries.
    pub fn dense(range: DateRange, stored: Vec<DailySummary>) -> Self {
        let days: Vec<DailySummary> = range
            .days()
            .map(|date| {
                stored
                    .iter()
                    .find(|s| s.date == date)
                    .cloned()
                    .unwrap_or_else(|| DailySummary::empty(date))
            })
            .collect();
        let totals = RangeTotals::from_days(&days);
        RangeReport {
            start: range.start,
            end: range.end,
            days,
            totals,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

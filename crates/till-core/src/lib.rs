//! # till-core: Pure Business Logic for the Till POS Ledger
//!
//! This crate holds the domain model of the invoice ledger as pure
//! functions and plain data, with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │         Order endpoint / Admin UI / Printer (collaborators)      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │  till-ledger: Allocator, Ledger, Reconciler, Day close, Reports │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ uses                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ invoice_no │  │ validation│  │   │
//! │  │   │  Invoice  │  │   Money   │  │ YYYYMMDD-N │  │   rules   │  │   │
//! │  │   │  Summary  │  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │   └───────────┘           ┌───────────┐                         │   │
//! │  │                           │  export   │  CSV + BOM              │   │
//! │  │                           └───────────┘                         │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Invoice, DailySummary, LedgerStats, ranges and reports
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`invoice_number`] - `{YYYYMMDD}-{NNN}` formatting and parsing
//! - [`validation`] - Submission rules, checked before numbering
//! - [`export`] - CSV rendering of daily summaries
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use till_core::{DailySummary, InvoiceNumber, LedgerStats};
//!
//! let date = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
//! assert_eq!(InvoiceNumber::new(date, 2).to_string(), "20250614-002");
//!
//! let stats = LedgerStats { invoice_count: 1, revenue_cents: 5000, discount_cents: 1000, max_sequence: 2 };
//! let summary = DailySummary::reconciled(date, None, &stats);
//! assert_eq!(summary.net_revenue_cents, 4000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod export;
pub mod invoice_number;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice_number::InvoiceNumber;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines on a single invoice.
pub const MAX_INVOICE_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Catches typos (1000 instead of 10) at the counter.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest invoice total, and largest unit price, in cents (1 billion).
///
/// Keeps a full invoice of maximum lines well inside i64, and leaves room
/// for millions of such invoices in one day's cached totals.
pub const MAX_INVOICE_TOTAL_CENTS: i64 = 100_000_000_000;

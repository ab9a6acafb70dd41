//! # Repository Module
//!
//! SQL for the two ledger tables, one repository per table.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  impl LedgerStore for Database (store.rs)                              │
//! │       │                                                                 │
//! │       ├── db.invoices()   → InvoiceRepository   → invoices             │
//! │       │                                                                 │
//! │       └── db.summaries()  → SummaryRepository   → daily_summaries      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Ledger rows
//! - [`SummaryRepository`](summary::SummaryRepository) - Sequence counter and cached totals

pub mod invoice;
pub mod summary;

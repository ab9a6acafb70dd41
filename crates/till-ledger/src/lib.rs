//! # till-ledger: Invoice Numbering and Reconciliation Engine
//!
//! Issues per-day invoice numbers under concurrent load, keeps the cached
//! daily aggregates in step with an editable ledger, and repairs them when
//! they drift.
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
//! │  │               ★ till-ledger (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   Ledger ──► SequenceAllocator ──► AggregateUpdater             │   │
//! │  │     │                                                           │   │
//! │  │     └──► Reconciler ◄── DayCloseManager      RangeReporter      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────────────────────────────────────────────────────┐   │   │
//! │  │   │                 LedgerStore (trait)                     │   │   │
//! │  │   └──────────────┬───────────────────────────┬──────────────┘   │   │
//! │  └──────────────────┼───────────────────────────┼──────────────────┘   │
//! │                     ▼                           ▼                       │
//! │          till-db (SQLite/sqlx)           MemoryStore (tests)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use till_core::{InvoiceItem, NewInvoice};
//! use till_ledger::{LedgerConfig, MemoryStore, Till};
//!
//! # async fn demo() -> Result<(), till_ledger::LedgerError> {
//! let till = Till::new(Arc::new(MemoryStore::new()), LedgerConfig::default());
//! let invoice = till
//!     .ledger()
//!     .append(NewInvoice {
//!         customer_name: "Ana".to_string(),
//!         customer_phone: "0300 1234567".to_string(),
//!         items: vec![InvoiceItem {
//!             game_id: None,
//!             title: "Elden Ring".to_string(),
//!             platform: Some("PS5".to_string()),
//!             quantity: 1,
//!             unit_price_cents: 10000,
//!         }],
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("{}", invoice.invoice_number);
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregates;
pub mod allocator;
pub mod clock;
pub mod config;
pub mod day_close;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod reconciler;
pub mod reporter;
pub mod store;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use aggregates::AggregateUpdater;
pub use allocator::SequenceAllocator;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, LedgerConfig};
pub use day_close::DayCloseManager;
pub use error::{ErrorBody, ErrorCode, LedgerError, LedgerResult, StoreError, StoreResult};
pub use ledger::Ledger;
pub use memory::MemoryStore;
pub use reconciler::Reconciler;
pub use reporter::RangeReporter;
pub use store::{LedgerStore, PurgeReport};

use std::sync::Arc;

// =============================================================================
// Facade
// =============================================================================

/// Every component wired to one store, one clock and one config.
#[derive(Debug)]
pub struct Till<S> {
    store: Arc<S>,
    config: Arc<LedgerConfig>,
    ledger: Ledger<S>,
    reconciler: Reconciler<S>,
    day_close: DayCloseManager<S>,
    reporter: RangeReporter<S>,
}

impl<S> Clone for Till<S> {
    fn clone(&self) -> Self {
        Till {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            ledger: self.ledger.clone(),
            reconciler: self.reconciler.clone(),
            day_close: self.day_close.clone(),
            reporter: self.reporter.clone(),
        }
    }
}

impl<S: LedgerStore> Till<S> {
    /// Wires the components against the system clock.
    pub fn new(store: Arc<S>, config: LedgerConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        let config = Arc::new(config);
        Till {
            ledger: Ledger::new(Arc::clone(&store), Arc::clone(&clock), Arc::clone(&config)),
            reconciler: Reconciler::new(Arc::clone(&store)),
            day_close: DayCloseManager::new(Arc::clone(&store), clock),
            reporter: RangeReporter::new(Arc::clone(&store), Arc::clone(&config)),
            store,
            config,
        }
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }

    pub fn day_close(&self) -> &DayCloseManager<S> {
        &self.day_close
    }

    pub fn reporter(&self) -> &RangeReporter<S> {
        &self.reporter
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

// =============================================================================
// End-to-end Tests
// =============================================================================

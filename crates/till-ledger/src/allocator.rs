//! # Sequence Allocator
//!
//! Hands out per-day invoice numbers.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  allocate(2025-06-14)                                                  │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  store.next_sequence(date)   ONE atomic upsert-and-read:               │
//! │     │                        row absent  → create with mark = 1        │
//! │     │                        row present → mark += 1                   │
//! │     ▼                                                                   │
//! │  InvoiceNumber::new(date, 3) → "20250614-003"                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Numbers for a date strictly increase and never repeat. A number whose
//! insert later fails is burned, which leaves a gap.

use chrono::NaiveDate;
use std::sync::Arc;
use till_core::InvoiceNumber;
use tracing::debug;

use crate::error::LedgerResult;
use crate::store::LedgerStore;

/// Issues `{YYYYMMDD}-{NNN}` numbers from the day's summary row.
#[derive(Debug)]
pub struct SequenceAllocator<S> {
    store: Arc<S>,
}

impl<S> Clone for SequenceAllocator<S> {
    fn clone(&self) -> Self {
        SequenceAllocator {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> SequenceAllocator<S> {
    pub fn new(store: Arc<S>) -> Self {
        SequenceAllocator { store }
    }

    /// Reserves the next number for `date`.
    pub async fn allocate(&self, date: NaiveDate) -> LedgerResult<InvoiceNumber> {
        let sequence = self.store.next_sequence(date).await?;
        let number = InvoiceNumber::new(date, sequence);
        debug!(%number, "Allocated invoice number");
        Ok(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use std::collections::HashSet;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[tokio::test]
    async fn test_first_number_of_the_day() {
        let allocator = SequenceAllocator::new(Arc::new(MemoryStore::new()));
        let number = allocator.allocate(day(14)).await.unwrap();
        assert_eq!(number.to_string(), "20250614-001");
        assert_eq!(allocator.allocate(day(14)).await.unwrap().to_string(), "20250614-002");
    }

    #[tokio::test]
    async fn test_days_number_independently() {
        let allocator = SequenceAllocator::new(Arc::new(MemoryStore::new()));
        allocator.allocate(day(14)).await.unwrap();
        allocator.allocate(day(14)).await.unwrap();
        assert_eq!(allocator.allocate(day(15)).await.unwrap().sequence(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocations_never_repeat() {
        let allocator = SequenceAllocator::new(Arc::new(MemoryStore::new()));
        let mut handles = Vec::new();
        for _ in 0..64 {
            let allocator = allocator.clone();
            handles.push(tokio::spawn(async move {
                allocator.allocate(day(14)).await.unwrap().sequence()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()));
        }
        assert_eq!(seen.len(), 64);
        assert_eq!(seen.iter().max(), Some(&64));
    }
}

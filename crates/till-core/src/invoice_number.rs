//! # Invoice Numbers
//!
//! The human-readable business identifier printed on every receipt.
//!
//! ## Format
//! ```text
//! 20250614-001
//! ────┬─── ─┬─
//!     │     └── Sequence for that civil day, zero-padded to at least 3 digits.
//!     │         Day 1000+ simply grows: 20250614-1000 (older numbers keep
//!     │         their original padding).
//!     └──────── Civil date (store timezone) the number was allocated for.
//! ```
//!
//! Numbers are unique, not dense: an allocation that never reaches the
//! ledger leaves a permanent gap.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Minimum width of the sequence part.
pub const SEQUENCE_MIN_WIDTH: usize = 3;

/// Length of the `YYYYMMDD` date part.
const DATE_PART_LEN: usize = 8;

/// A parsed `{YYYYMMDD}-{NNN}` invoice number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvoiceNumber {
    date: NaiveDate,
    sequence: i64,
}

impl InvoiceNumber {
    /// Composes a number from a civil date and an allocated sequence.
    pub fn new(date: NaiveDate, sequence: i64) -> Self {
        InvoiceNumber { date, sequence }
    }

    /// The civil date component.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The allocated per-day sequence.
    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    /// Parses a number, rejecting anything the allocator could not have issued.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::InvoiceNumber;
    ///
    /// let n = InvoiceNumber::parse("20250614-002").unwrap();
    /// assert_eq!(n.sequence(), 2);
    /// assert_eq!(n.to_string(), "20250614-002");
    ///
    /// assert!(InvoiceNumber::parse("20250614-02").is_err());
    /// assert!(InvoiceNumber::parse("2025-06-14-002").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidInvoiceNumber {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let (date_part, seq_part) = value
            .split_once('-')
            .ok_or_else(|| invalid("missing '-' separator"))?;

        if date_part.len() != DATE_PART_LEN || !date_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("date part must be YYYYMMDD"));
        }
        let date = NaiveDate::parse_from_str(date_part, "%Y%m%d")
            .map_err(|_| invalid("date part is not a calendar date"))?;

        if seq_part.len() < SEQUENCE_MIN_WIDTH || !seq_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("sequence must be at least 3 digits"));
        }
        let sequence: i64 = seq_part
            .parse()
            .map_err(|_| invalid("sequence out of range"))?;
        if sequence <= 0 {
            return Err(invalid("sequence must be positive"));
        }

        Ok(InvoiceNumber { date, sequence })
    }
}

/// Extracts the numeric suffix of a stored invoice number.
///
/// Reconciliation uses this on raw column values; rows that do not follow
/// the format contribute nothing to the high-water mark.
pub fn sequence_suffix(value: &str) -> Option<i64> {
    InvoiceNumber::parse(value).ok().map(|n| n.sequence)
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:0width$}",
            self.date.format("%Y%m%d"),
            self.sequence,
            width = SEQUENCE_MIN_WIDTH
        )
    }
}

impl FromStr for InvoiceNumber {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceNumber::parse(s)
    }
}

impl TryFrom<String> for InvoiceNumber {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        InvoiceNumber::parse(&value)
    }
}

impl From<InvoiceNumber> for String {
    fn from(value: InvoiceNumber) -> Self {
        value.to_string()
    }
}

//! # Ledger Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  Backend failure (sqlx / memory)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError  ← What every LedgerStore reports                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerError ← Adds domain meaning (AllocationConflict, AlreadyClosed) │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ErrorBody { code, message } ← Serialized for the admin UI / endpoint  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use till_core::{CoreError, ValidationError};
use tracing::error;

// =============================================================================
// Store Error
// =============================================================================

/// Errors reported by a [`LedgerStore`](crate::store::LedgerStore) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting an invoice whose number is already in use
    /// - Inserting an invoice with a duplicate id
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A row addressed by key does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The backend cannot be reached (closed pool, timeout, offline).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected or failed a statement.
    #[error("Store query failed: {0}")]
    Query(String),

    /// A stored row could not be decoded into a domain type.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when the violated constraint is the invoice number index.
    ///
    /// Only this case is recoverable by allocating a fresh number.
    pub fn is_invoice_number_conflict(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { field, .. } if field.contains("invoice_number"))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Ledger Error
// =============================================================================

/// Errors surfaced by the ledger components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Submission or edit rejected before touching numbering.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Every insert attempt collided on the invoice number.
    ///
    /// ## When This Occurs
    /// Only when the counter row no longer covers numbers already in the
    /// ledger (hand-edited summary, partial restore) and the bounded retry
    /// ran out. A reconcile of `date` repairs the counter.
    #[error("Could not allocate a unique invoice number for {date} after {attempts} attempts")]
    AllocationConflict { date: NaiveDate, attempts: u32 },

    /// `close` on a day that is already closed.
    #[error("Day {date} is already closed")]
    AlreadyClosed { date: NaiveDate },

    /// A write to a closed day while the closed-day guard is enabled.
    #[error("Day {date} is closed; ledger writes are not allowed")]
    DayClosed { date: NaiveDate },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Persistence unreachable. Fatal for the request.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Any other persistence failure.
    #[error("Store error: {0}")]
    Store(String),

    /// CSV rendering failed.
    #[error("Export failed: {0}")]
    Export(String),
}

impl LedgerError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Machine-readable code for programmatic handling.
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Validation(_) => ErrorCode::ValidationError,
            LedgerError::AllocationConflict { .. } => ErrorCode::AllocationConflict,
            LedgerError::AlreadyClosed { .. } => ErrorCode::AlreadyClosed,
            LedgerError::DayClosed { .. } => ErrorCode::DayClosed,
            LedgerError::NotFound { .. } => ErrorCode::NotFound,
            LedgerError::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
            LedgerError::Store(_) => ErrorCode::StoreError,
            LedgerError::Export(_) => ErrorCode::ExportFailed,
        }
    }

    /// The serializable form handed to callers.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Converts backend errors into ledger errors.
///
/// ## Error Mapping
/// ```text
/// StoreError::NotFound        → LedgerError::NotFound
/// StoreError::Unavailable     → LedgerError::StoreUnavailable
/// StoreError::UniqueViolation → LedgerError::Store (number conflicts are
///                               handled by the append loop before this)
/// StoreError::Query / Corrupt → LedgerError::Store (logged)
/// ```
impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            StoreError::Unavailable(msg) => LedgerError::StoreUnavailable(msg),
            StoreError::UniqueViolation { .. } => LedgerError::Store(err.to_string()),
            StoreError::Query(ref msg) | StoreError::Corrupt(ref msg) => {
                error!(error = %msg, "Store operation failed");
                LedgerError::Store(err.to_string())
            }
        }
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => LedgerError::Validation(e),
            CoreError::InvalidInvoiceNumber { value, reason } => {
                LedgerError::Validation(ValidationError::InvalidFormat {
                    field: format!("invoice_number '{}'", value),
                    reason,
                })
            }
            CoreError::Export(msg) => LedgerError::Export(msg),
        }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Error Codes
// =============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    AllocationConflict,
    AlreadyClosed,
    DayClosed,
    NotFound,
    StoreUnavailable,
    StoreError,
    ExportFailed,
}

/// What a caller receives when an operation fails.
///
/// ```json
/// { "code": "ALREADY_CLOSED", "message": "Day 2025-06-14 is already closed" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_number_conflict_detection() {
        let conflict = StoreError::UniqueViolation {
            field: "invoices.invoice_number".to_string(),
            value: "20250614-001".to_string(),
        };
        assert!(conflict.is_invoice_number_conflict());

        let id_clash = StoreError::UniqueViolation {
            field: "invoices.id".to_string(),
            value: "x".to_string(),
        };
        assert!(!id_clash.is_invoice_number_conflict());
    }

    #[test]
    fn test_store_error_mapping() {
        let err: LedgerError = StoreError::Unavailable("pool closed".to_string()).into();
        assert_eq!(err.code(), ErrorCode::StoreUnavailable);

        let err: LedgerError = StoreError::not_found("Invoice", "abc").into();
        assert_eq!(err, LedgerError::not_found("Invoice", "abc"));

        let err: LedgerError = StoreError::Query("syntax".to_string()).into();
        assert_eq!(err.code(), ErrorCode::StoreError);
    }

    #[test]
    fn test_error_body_serialization() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
        let body = LedgerError::AlreadyClosed { date }.to_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "ALREADY_CLOSED");
        assert_eq!(json["message"], "Day 2025-06-14 is already closed");
    }
}

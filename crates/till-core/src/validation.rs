//! # Validation Module
//!
//! Input validation for invoice submissions and edits.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Order endpoint / admin UI                                    │
//! │  └── Deserialization (types, required JSON keys)                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rules                                 │
//! │  ├── customer name + phone present                                     │
//! │  ├── at least one item, sane quantities and prices                     │
//! │  └── 0 ≤ discount ≤ total                                              │
//! │           │                                                             │
//! │           ▼   (only now is a sequence number allocated)                │
//! │  Layer 3: Database                                                     │
//! │  ├── NOT NULL constraints                                              │
//! │  └── UNIQUE(invoice_number)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{Invoice, InvoiceItem, NewInvoice};
use crate::{MAX_INVOICE_ITEMS, MAX_INVOICE_TOTAL_CENTS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest customer name we accept.
const MAX_NAME_LEN: usize = 200;

/// Longest phone string we accept (digits, spaces, +, -).
const MAX_PHONE_LEN: usize = 32;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required, bounded text field.
fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates the customer name.
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_customer_name;
///
/// assert!(validate_customer_name("Nguyen Van A").is_ok());
/// assert!(validate_customer_name("   ").is_err());
/// ```
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    validate_required_text("customer_name", name, MAX_NAME_LEN)
}

/// Validates the customer phone.
///
/// Only presence and a loose character set are checked; numbers are not
/// normalized.
pub fn validate_customer_phone(phone: &str) -> ValidationResult<()> {
    validate_required_text("customer_phone", phone, MAX_PHONE_LEN)?;

    if !phone
        .trim()
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '.'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "customer_phone".to_string(),
            reason: "must contain only digits, spaces, and + - ( ) .".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Item and Amount Validators
// =============================================================================

/// Validates the item list.
///
/// ## Rules
/// - At least one item, at most MAX_INVOICE_ITEMS
/// - Every title present
/// - 1 ≤ quantity ≤ MAX_ITEM_QUANTITY
/// - 0 ≤ unit price ≤ MAX_INVOICE_TOTAL_CENTS (free promo items are allowed)
pub fn validate_items(items: &[InvoiceItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    if items.len() > MAX_INVOICE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_INVOICE_ITEMS as i64,
        });
    }

    for item in items {
        validate_required_text("item title", &item.title, MAX_NAME_LEN)?;

        if item.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "item quantity".to_string(),
            });
        }
        if item.quantity > MAX_ITEM_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: "item quantity".to_string(),
                min: 1,
                max: MAX_ITEM_QUANTITY,
            });
        }
        if !(0..=MAX_INVOICE_TOTAL_CENTS).contains(&item.unit_price_cents) {
            return Err(ValidationError::OutOfRange {
                field: "item price".to_string(),
                min: 0,
                max: MAX_INVOICE_TOTAL_CENTS,
            });
        }
    }

    Ok(())
}

/// Validates total and discount.
///
/// ## Rules
/// - 0 ≤ total ≤ MAX_INVOICE_TOTAL_CENTS
/// - 0 ≤ discount ≤ total (final total never negative)
pub fn validate_amounts(total_cents: i64, discount_cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_INVOICE_TOTAL_CENTS).contains(&total_cents) {
        return Err(ValidationError::OutOfRange {
            field: "total".to_string(),
            min: 0,
            max: MAX_INVOICE_TOTAL_CENTS,
        });
    }

    if discount_cents < 0 || discount_cents > total_cents {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: total_cents,
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates a submission before a sequence number is requested.
///
/// ## User Workflow
/// ```text
/// POS submits order
///      │
///      ▼
/// validate_submission() ← THIS FUNCTION
///      │
///      ├── Err → rejected, no number burned
///      │
///      └── Ok  → allocate number → insert → bump daily totals
/// ```
pub fn validate_submission(submission: &NewInvoice) -> ValidationResult<()> {
    validate_customer_name(&submission.customer_name)?;
    validate_customer_phone(&submission.customer_phone)?;
    validate_items(&submission.items)?;
    let total = submission.resolved_total()?;
    validate_amounts(total.cents(), submission.discount_cents)
}

/// Validates an invoice after an edit has been applied to it.
pub fn validate_invoice(invoice: &Invoice) -> ValidationResult<()> {
    validate_customer_name(&invoice.customer_name)?;
    validate_customer_phone(&invoice.customer_phone)?;
    validate_items(&invoice.items)?;
    validate_amounts(invoice.total_cents, invoice.discount_cents)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> InvoiceItem {
        InvoiceItem {
            game_id: Some("g-1".to_string()),
            title: "Zelda: TOTK".to_string(),
            platform: Some("Switch".to_string()),
            quantity: 1,
            unit_price_cents: 5999,
        }
    }

    fn submission() -> NewInvoice {
        NewInvoice {
            customer_name: "Tran Thi B".to_string(),
            customer_phone: "+84 90 123 4567".to_string(),
            items: vec![item()],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_submission() {
        assert!(validate_submission(&submission()).is_ok());
    }

    #[test]
    fn test_missing_customer_fields() {
        let mut s = submission();
        s.customer_name = "  ".to_string();
        assert_eq!(
            validate_submission(&s),
            Err(ValidationError::required("customer_name"))
        );

        let mut s = submission();
        s.customer_phone = String::new();
        assert_eq!(
            validate_submission(&s),
            Err(ValidationError::required("customer_phone"))
        );
    }

    #[test]
    fn test_phone_format() {
        assert!(validate_customer_phone("(028) 3822-1234").is_ok());
        assert!(validate_customer_phone("call me").is_err());
    }

    #[test]
    fn test_empty_items() {
        let mut s = submission();
        s.items.clear();
        assert!(matches!(
            validate_submission(&s),
            Err(ValidationError::Empty { .. })
        ));
    }

    #[test]
    fn test_item_rules() {
        let mut bad = item();
        bad.quantity = 0;
        assert!(validate_items(&[bad]).is_err());

        let mut bad = item();
        bad.quantity = MAX_ITEM_QUANTITY + 1;
        assert!(validate_items(&[bad]).is_err());

        let mut bad = item();
        bad.unit_price_cents = -1;
        assert!(validate_items(&[bad]).is_err());

        let mut free = item();
        free.unit_price_cents = 0;
        assert!(validate_items(&[free]).is_ok());
    }

    #[test]
    fn test_oversized_amounts_are_rejected() {
        let mut pricey = item();
        pricey.unit_price_cents = MAX_INVOICE_TOTAL_CENTS + 1;
        assert!(validate_items(&[pricey]).is_err());

        assert!(validate_amounts(MAX_INVOICE_TOTAL_CENTS, 0).is_ok());
        assert!(validate_amounts(MAX_INVOICE_TOTAL_CENTS + 1, 0).is_err());

        // Overflowing line totals come back as an error, not a panic.
        let mut s = submission();
        s.items[0].quantity = 2;
        s.items[0].unit_price_cents = i64::MAX / 2 + 1;
        assert!(matches!(
            validate_submission(&s),
            Err(ValidationError::OutOfRange { .. })
        ));

        // So does an explicit total past the ceiling.
        let mut s = submission();
        s.total_cents = Some(i64::MAX - 1);
        assert!(validate_submission(&s).is_err());
    }

    #[test]
    fn test_amounts() {
        assert!(validate_amounts(10000, 0).is_ok());
        assert!(validate_amounts(10000, 10000).is_ok());
        assert!(validate_amounts(10000, 10001).is_err());
        assert!(validate_amounts(10000, -1).is_err());
        assert!(validate_amounts(-1, 0).is_err());
    }

    #[test]
    fn test_discount_checked_against_item_subtotal() {
        let mut s = submission();
        s.discount_cents = 6000;
        assert!(validate_submission(&s).is_err());
        s.discount_cents = 999;
        assert!(validate_submission(&s).is_ok());
    }
}

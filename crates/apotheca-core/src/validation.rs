//! # Validation Module
//!
//! Input validation for ledger operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Calling UI — format checks, immediate feedback                │
//! │  Layer 2: THIS MODULE — business rule validation before any write       │
//! │  Layer 3: SQLite — NOT NULL, CHECK (quantity >= 0), foreign keys        │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - Must be at most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a stock adjustment reason.
///
/// A whitespace-only reason is an empty audit entry, so it is rejected the
/// same as an empty one.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    if reason.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    Ok(())
}

/// Validates an invoice identifier supplied by the caller.
///
/// The sequencer's suggestion is advisory; callers may pass any non-empty
/// string and it becomes the grouping key for the sale's lines.
pub fn validate_invoice(invoice: &str) -> ValidationResult<()> {
    if invoice.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "invoice".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a stock count or reorder level (>= 0).
pub fn validate_stock_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a monetary amount that must not be negative (price, cost).
pub fn validate_money_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

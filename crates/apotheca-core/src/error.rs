//! # Error Types
//!
//! Domain-specific error types for apotheca-core.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Validation(ValidationError)  malformed caller input, fix and retry     │
//! │  ProductNotFound / InvoiceNotFound    referenced entity absent          │
//! │  InsufficientStock            business-rule violation on quantity       │
//! │  ProductHasSales / ReversalTargetMissing   integrity-guard conflicts    │
//! │                                                                         │
//! │  Storage failures live in apotheca-db (DbError) and wrap this enum.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, invoice, quantities)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger business logic errors.
///
/// Every mutating operation either fully applies or surfaces one of these
/// with no partial state left behind.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id does not resolve.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// No sale line references the invoice (also raised by a second undo
    /// of the same invoice — reversal removes the rows).
    #[error("No sale found for invoice {0}")]
    InvoiceNotFound(String),

    /// Requested quantity exceeds what is on hand.
    ///
    /// Raised both by sales (`requested` units against `available`) and by
    /// negative adjustments that would take stock below zero.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        available: i64,
        requested: i64,
    },

    /// A sale must carry at least one line item.
    #[error("Cannot record an empty sale")]
    EmptySale,

    /// Line quantity must be strictly positive.
    #[error("Quantity must be positive for product {product_id}")]
    NonPositiveQuantity { product_id: i64 },

    /// `qty × (unit_price − discount)` came out negative.
    ///
    /// The per-unit discount itself may exceed the unit price; only the
    /// line total is bounded. Intentional, see `SaleLineInput`.
    #[error("Line total cannot be negative for product {product_id}")]
    NegativeLineTotal { product_id: i64 },

    /// A stock adjustment of zero would be a ledger entry with no meaning.
    #[error("Adjustment quantity cannot be zero")]
    ZeroAdjustment,

    /// Deleting the product would orphan sale history.
    #[error("Cannot delete product {product_id}: {sale_rows} sale line(s) reference it")]
    ProductHasSales { product_id: i64, sale_rows: i64 },

    /// A reversal found a sale line whose product no longer exists, so the
    /// stock restore cannot be applied. The whole reversal aborts; a silent
    /// skip would break the accounting identity.
    #[error("Cannot reverse invoice {invoice}: product {product_id} no longer exists")]
    ReversalTargetMissing { invoice: String, product_id: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements; they are raised
/// before any write is attempted.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be zero or greater.
    #[error("{field} must be non-negative")]
    MustBeNonNegative { field: String },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

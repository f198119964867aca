//! # Domain Types
//!
//! Core domain types for the inventory & sales ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌────────────────┐   ┌───────────────────┐   ┌──────────────────┐     │
//! │  │    Product     │   │ AdjustmentRecord  │   │  SaleLineRecord  │     │
//! │  │  ────────────  │   │  ───────────────  │   │  ──────────────  │     │
//! │  │  id (i64)      │◄──│  product_id       │   │  invoice (group) │     │
//! │  │  quantity      │   │  adjustment_qty   │   │  product_id      │     │
//! │  │  price_mils    │   │  reason           │   │  qty, total_mils │     │
//! │  └────────────────┘   └───────────────────┘   └──────────────────┘     │
//! │                                                                         │
//! │  Product.quantity is always the sum of adjustment deltas minus the      │
//! │  net of committed sale quantities — the accounting identity every       │
//! │  engine operation preserves.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Monetary columns are integer mils (see [`crate::money`]); the `*_mils`
//! fields are the raw stored values, with `Money`-typed accessors alongside.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A catalog product. Owns the current-quantity truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (database rowid).
    pub id: i64,

    /// Display name, non-empty.
    pub name: String,

    /// Optional category reference (categories are administered by the
    /// calling layer; deletion of a category nulls this out).
    pub category_id: Option<i64>,

    /// Units on hand. Never negative.
    pub quantity: i64,

    /// Sale price per unit, in mils.
    pub price_mils: i64,

    /// Acquisition cost per unit, in mils.
    pub cost_mils: i64,

    /// Restock alert threshold.
    pub reorder_level: i64,

    /// Supplier name, free-form.
    pub supplier: Option<String>,

    /// Expiry date, if the product expires.
    pub expiry_date: Option<NaiveDate>,

    /// When the product was created.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Sale price as a Money value.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_mils(self.price_mils)
    }

    /// Acquisition cost as a Money value.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_mils(self.cost_mils)
    }

    /// At or below the restock threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

/// Caller-supplied fields for creating or editing a product.
///
/// Identity and `created_at` are owned by the store; everything else the
/// catalog caller provides here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category_id: Option<i64>,
    pub quantity: i64,
    pub price: Money,
    pub cost: Money,
    pub reorder_level: i64,
    pub supplier: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

// =============================================================================
// Adjustment Ledger
// =============================================================================

/// Reason recorded when a product is created with starting stock.
pub const INITIAL_STOCK_REASON: &str = "Initial stock entry";

/// Reason recorded when a catalog edit changes the quantity field.
pub fn edit_adjustment_reason(new_qty: i64) -> String {
    format!("Manual edit/correction (new qty: {new_qty})")
}

/// One append-only stock adjustment. Immutable once created; removed only
/// when its product is deleted (and that is blocked while sales exist).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AdjustmentRecord {
    pub id: i64,

    pub product_id: i64,

    /// Signed delta applied to the product quantity. Never zero.
    pub adjustment_qty: i64,

    /// Why the stock changed. Never empty.
    pub reason: String,

    /// Opaque actor reference; null means system-generated or anonymized.
    pub adjusted_by: Option<i64>,

    pub adjusted_at: DateTime<Utc>,
}

/// Optional filters for adjustment history queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdjustmentFilter {
    pub product_id: Option<i64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

// =============================================================================
// Sale Ledger
// =============================================================================

/// One committed sale line. Lines sharing an invoice string were committed
/// together in one sale; the invoice is a grouping key, not an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLineRecord {
    pub id: i64,

    /// Grouping key shared by every line of one sale.
    pub invoice: String,

    pub product_id: i64,

    /// Units sold, strictly positive.
    pub qty: i64,

    /// Unit price at time of sale, in mils.
    pub unit_price_mils: i64,

    /// Cost snapshot at time of sale, in mils. Decoupled from the product's
    /// current cost so historical profit is stable.
    pub unit_cost_mils: i64,

    /// Per-unit discount, in mils.
    pub discount_mils: i64,

    /// Line total after discount, rounded to the cent, in mils.
    pub total_mils: i64,

    /// Opaque actor reference; null means anonymized.
    pub sold_by: Option<i64>,

    pub sold_at: DateTime<Utc>,
}

impl SaleLineRecord {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_mils(self.unit_price_mils)
    }

    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_mils(self.unit_cost_mils)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_mils(self.discount_mils)
    }

    /// Revenue for this line (already discounted and rounded).
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_mils(self.total_mils)
    }

    /// Cost of goods for this line, from the at-sale snapshot.
    #[inline]
    pub fn total_cost(&self) -> Money {
        self.unit_cost().multiply_quantity(self.qty)
    }

    /// Profit for this line: revenue minus snapshot cost.
    #[inline]
    pub fn profit(&self) -> Money {
        self.total() - self.total_cost()
    }
}

/// One line item of a sale to be committed — the caller-owned cart value.
///
/// The ledger holds no per-user cart state; callers assemble these and pass
/// the whole batch into `record_sale`.
///
/// The per-unit `discount` is allowed to exceed `unit_price` (a >100%
/// discount); only the resulting line total is required to be non-negative.
/// This mirrors the cart policy of the calling layer and is intentional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLineInput {
    pub product_id: i64,
    pub qty: i64,
    pub unit_price: Money,
    /// Cost snapshot carried into the sale record; not re-read from the
    /// product at commit time.
    pub unit_cost: Money,
    pub discount: Money,
}

impl SaleLineInput {
    /// Per-unit discount normalized to whole cents.
    #[inline]
    pub fn discount_per_unit(&self) -> Money {
        self.discount.round_to_cent()
    }

    /// `round(qty × (unit_price − discount), 2)` — the receipt total for
    /// this line, rounded independently of every other line.
    pub fn line_total(&self) -> Money {
        (self.unit_price - self.discount_per_unit())
            .multiply_quantity(self.qty)
            .round_to_cent()
    }
}

/// Optional filters for sale history queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub product_id: Option<i64>,
    pub invoice: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

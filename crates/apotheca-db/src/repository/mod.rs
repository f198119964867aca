//! # Repository Module
//!
//! Repository implementations for the ledger store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller                                                                 │
//! │    │  db.sales().record_sale("INV-250109-001", &lines, Some(actor))    │
//! │    ▼                                                                    │
//! │  SaleRepository ── one transaction: validate, append, decrement         │
//! │    ▼                                                                    │
//! │  SQLite                                                                 │
//! │                                                                         │
//! │  The repositories are the ONLY paths that change a product's quantity;  │
//! │  every change leaves a matching ledger row (stock_adjustments for       │
//! │  corrections, sales for sale-driven decrements).                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - catalog create/edit/delete + reads
//! - [`adjustment::AdjustmentRepository`] - stock adjustment engine + history
//! - [`sale::SaleRepository`] - sale commit, reversal, invoice sequencing

pub mod adjustment;
pub mod product;
pub mod sale;

//! # apotheca-core: Pure Business Logic for the Apotheca Ledger
//!
//! This crate is the **heart** of the inventory & sales ledger. It contains
//! all business rules as pure functions and types with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Apotheca Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          External callers (UI / CLI / reporting)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ apotheca-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐ ┌───────────┐ ┌───────────┐ ┌────────────┐    │   │
//! │  │   │   types   │ │   money   │ │  invoice  │ │ validation │    │   │
//! │  │   │  Product  │ │   Money   │ │ INV-.....│ │   rules    │    │   │
//! │  │   │ SaleLine  │ │  rounding │ │ formatting│ │   checks   │    │   │
//! │  │   └───────────┘ └───────────┘ └───────────┘ └────────────┘    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • PURE FUNCTIONS                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            apotheca-db (transactional ledger store)             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, AdjustmentRecord, SaleLineRecord, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`invoice`] - Invoice identifier formatting
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic, same input = same output
//! 2. **No I/O**: database and file access are FORBIDDEN here
//! 3. **Integer Money**: all monetary values are mils (i64), never floats
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

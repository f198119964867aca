//! # apotheca-db: Transactional Ledger Store
//!
//! SQLite persistence for the Apotheca inventory & sales ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │          External callers (UI / CLI / reporting)                        │
//! └─────────────────────────────┬───────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────▼───────────────────────────────────────────┐
//! │                  ★ apotheca-db (THIS CRATE) ★                           │
//! │                                                                         │
//! │   ┌──────────┐  ┌────────────┐  ┌──────────────────────────────────┐   │
//! │   │   pool   │  │ migrations │  │           repository             │   │
//! │   │ Database │  │  embedded  │  │  products / adjustments / sales  │   │
//! │   │ DbConfig │  │    SQL     │  │  (transactional, write-locked)   │   │
//! │   └──────────┘  └────────────┘  └──────────────────────────────────┘   │
//! │                               │                                         │
//! │                  apotheca-core (pure business rules)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("apotheca.db")).await?;
//!
//! let suggestion = db.sales().next_invoice_id(Utc::now().date_naive()).await?;
//! let total = db.sales().record_sale(&suggestion, &lines, Some(actor)).await?;
//! ```
//!
//! ## Guarantees
//!
//! - Every mutating operation is one SQLite transaction: it fully applies
//!   or leaves no trace.
//! - Mutating transactions are serialized by a process-wide write lock, so
//!   stock checks never race each other.
//! - Product quantities change only through the repositories, and every
//!   change leaves a ledger row.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::adjustment::AdjustmentRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;

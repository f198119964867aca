//! # Stock Adjustment Repository
//!
//! The adjustment engine: every manual stock change flows through
//! [`AdjustmentRepository::adjust`], which validates, re-checks the current
//! quantity, applies the delta, and appends the ledger row in one
//! transaction.
//!
//! ```text
//! adjust(product_id, delta, reason, actor)
//!    │
//!    ├── delta == 0?            → ZeroAdjustment
//!    ├── reason blank?          → Validation(Required)
//!    │   (acquire write lock, begin tx)
//!    ├── SELECT quantity        → ProductNotFound
//!    ├── quantity + delta < 0?  → InsufficientStock
//!    ├── UPDATE products
//!    └── INSERT stock_adjustments, commit
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::DbResult;
use apotheca_core::{validation, AdjustmentFilter, AdjustmentRecord, CoreError};

/// Appends one row to the adjustment ledger inside an open transaction.
///
/// Shared with the catalog repository, which logs initial stock and
/// quantity edits through the same ledger. The caller has already applied
/// (or is about to apply) the matching quantity change in the same
/// transaction.
pub(crate) async fn append_entry(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: i64,
    delta: i64,
    reason: &str,
    adjusted_by: Option<i64>,
    at: DateTime<Utc>,
) -> DbResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO stock_adjustments (product_id, adjustment_qty, reason, adjusted_by, adjusted_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(reason)
    .bind(adjusted_by)
    .bind(at)
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Repository for stock adjustments.
#[derive(Debug, Clone)]
pub struct AdjustmentRepository {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl AdjustmentRepository {
    /// Creates a new AdjustmentRepository.
    pub fn new(pool: SqlitePool, write_lock: Arc<Mutex<()>>) -> Self {
        AdjustmentRepository { pool, write_lock }
    }

    /// Applies a signed stock delta and appends the matching ledger row.
    ///
    /// The quantity check runs against the current stored value inside the
    /// transaction, not against anything the caller read earlier, so a
    /// stale caller view can never drive stock negative.
    pub async fn adjust(
        &self,
        product_id: i64,
        delta: i64,
        reason: &str,
        adjusted_by: Option<i64>,
    ) -> DbResult<AdjustmentRecord> {
        if delta == 0 {
            return Err(CoreError::ZeroAdjustment.into());
        }
        validation::validate_reason(reason).map_err(CoreError::from)?;

        let reason = reason.trim().to_string();

        debug!(product_id, delta, "Applying stock adjustment");

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?;
        let current = current.ok_or(CoreError::ProductNotFound(product_id))?;

        let new_qty = current + delta;
        if new_qty < 0 {
            return Err(CoreError::InsufficientStock {
                product_id,
                available: current,
                requested: -delta,
            }
            .into());
        }

        sqlx::query("UPDATE products SET quantity = ?2 WHERE id = ?1")
            .bind(product_id)
            .bind(new_qty)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        let id = append_entry(&mut tx, product_id, delta, &reason, adjusted_by, now).await?;

        tx.commit().await?;

        debug!(product_id, new_qty, "Stock adjustment committed");

        Ok(AdjustmentRecord {
            id,
            product_id,
            adjustment_qty: delta,
            reason,
            adjusted_by,
            adjusted_at: now,
        })
    }

    /// Adjustment history, newest first. All filters are optional and
    /// combine with AND; date bounds are inclusive calendar days.
    pub async fn list(&self, filter: &AdjustmentFilter) -> DbResult<Vec<AdjustmentRecord>> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT id, product_id, adjustment_qty, reason, adjusted_by, adjusted_at \
             FROM stock_adjustments WHERE 1=1",
        );

        if let Some(product_id) = filter.product_id {
            query.push(" AND product_id = ").push_bind(product_id);
        }
        if let Some(from) = filter.date_from {
            query.push(" AND date(adjusted_at) >= date(").push_bind(from).push(")");
        }
        if let Some(to) = filter.date_to {
            query.push(" AND date(adjusted_at) <= date(").push_bind(to).push(")");
        }

        query.push(" ORDER BY adjusted_at DESC, id DESC");

        let records = query
            .build_query_as::<AdjustmentRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

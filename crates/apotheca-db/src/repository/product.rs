//! # Product Repository
//!
//! Catalog operations. Create and edit feed the adjustment ledger: a
//! starting quantity and any quantity edit are logged as adjustments in the
//! same transaction as the catalog write, so the accounting identity
//! (`quantity == Σ adjustment deltas − Σ committed sale quantities`)
//! holds after every operation.
//!
//! Deletion is guarded: a product referenced by sale history cannot be
//! removed; one with only adjustment history deletes together with those
//! adjustment rows.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::adjustment;
use apotheca_core::{
    edit_adjustment_reason, validation, CoreError, NewProduct, Product, INITIAL_STOCK_REASON,
};

/// Columns selected for row-mapping into [`Product`].
const PRODUCT_COLS: &str =
    "id, name, category_id, quantity, price_mils, cost_mils, reorder_level, \
     supplier, expiry_date, created_at";

/// Repository for catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, write_lock: Arc<Mutex<()>>) -> Self {
        ProductRepository { pool, write_lock }
    }

    fn validate_draft(draft: &NewProduct) -> DbResult<()> {
        validation::validate_product_name(&draft.name).map_err(CoreError::from)?;
        validation::validate_stock_quantity("quantity", draft.quantity)
            .map_err(CoreError::from)?;
        validation::validate_stock_quantity("reorder_level", draft.reorder_level)
            .map_err(CoreError::from)?;
        validation::validate_money_non_negative("price", draft.price)
            .map_err(CoreError::from)?;
        validation::validate_money_non_negative("cost", draft.cost).map_err(CoreError::from)?;
        Ok(())
    }

    fn normalized_supplier(draft: &NewProduct) -> Option<String> {
        draft
            .supplier
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    /// Adds a product to the catalog.
    ///
    /// When the draft carries starting stock, an "Initial stock entry"
    /// adjustment is appended in the same transaction; a zero-quantity
    /// draft produces no ledger row.
    pub async fn create(&self, draft: &NewProduct) -> DbResult<Product> {
        Self::validate_draft(draft)?;

        let name = draft.name.trim().to_string();
        let supplier = Self::normalized_supplier(draft);
        let now = Utc::now();

        debug!(name = %name, quantity = draft.quantity, "Creating product");

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO products (
                name, category_id, quantity, price_mils, cost_mils,
                reorder_level, supplier, expiry_date, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&name)
        .bind(draft.category_id)
        .bind(draft.quantity)
        .bind(draft.price.mils())
        .bind(draft.cost.mils())
        .bind(draft.reorder_level)
        .bind(&supplier)
        .bind(draft.expiry_date)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();

        if draft.quantity > 0 {
            adjustment::append_entry(&mut tx, id, draft.quantity, INITIAL_STOCK_REASON, None, now)
                .await?;
        }

        tx.commit().await?;

        Ok(Product {
            id,
            name,
            category_id: draft.category_id,
            quantity: draft.quantity,
            price_mils: draft.price.mils(),
            cost_mils: draft.cost.mils(),
            reorder_level: draft.reorder_level,
            supplier,
            expiry_date: draft.expiry_date,
            created_at: now,
        })
    }

    /// Edits a product's details.
    ///
    /// A change to the quantity field is logged through the adjustment
    /// ledger with a system-generated reason naming the new quantity,
    /// attributed to the editing actor. When only non-quantity fields
    /// change, no ledger row is produced.
    pub async fn update(
        &self,
        id: i64,
        draft: &NewProduct,
        adjusted_by: Option<i64>,
    ) -> DbResult<()> {
        Self::validate_draft(draft)?;

        let name = draft.name.trim().to_string();
        let supplier = Self::normalized_supplier(draft);

        debug!(id = %id, new_quantity = draft.quantity, "Updating product");

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let current_qty: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let current_qty = current_qty.ok_or(CoreError::ProductNotFound(id))?;

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category_id = ?3,
                quantity = ?4,
                price_mils = ?5,
                cost_mils = ?6,
                reorder_level = ?7,
                supplier = ?8,
                expiry_date = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(draft.category_id)
        .bind(draft.quantity)
        .bind(draft.price.mils())
        .bind(draft.cost.mils())
        .bind(draft.reorder_level)
        .bind(&supplier)
        .bind(draft.expiry_date)
        .execute(&mut *tx)
        .await?;

        let delta = draft.quantity - current_qty;
        if delta != 0 {
            adjustment::append_entry(
                &mut tx,
                id,
                delta,
                &edit_adjustment_reason(draft.quantity),
                adjusted_by,
                Utc::now(),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Deletes a product.
    ///
    /// Fails while any sale line references it (history integrity);
    /// otherwise removes its adjustment rows and the product in one
    /// transaction.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let sale_rows: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE product_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if sale_rows > 0 {
            return Err(CoreError::ProductHasSales {
                product_id: id,
                sale_rows,
            }
            .into());
        }

        sqlx::query("DELETE FROM stock_adjustments WHERE product_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id).into());
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a product by id.
    pub async fn get(&self, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by id, failing when absent.
    pub async fn get_required(&self, id: i64) -> DbResult<Product> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::ProductNotFound(id)))
    }

    /// Lists the whole catalog, name ascending.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLS} FROM products ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Lists products at or below their reorder level, name ascending.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLS} FROM products WHERE quantity <= reorder_level ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts catalog entries (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{draft, memory_db};
    use apotheca_core::{AdjustmentFilter, Money, SaleLineInput};

    #[tokio::test]
    async fn test_create_with_stock_logs_initial_adjustment() {
        let db = memory_db().await;

        let product = db.products().create(&draft("Ibuprofen 200mg", 100)).await.unwrap();
        assert_eq!(product.quantity, 100);

        let history = db
            .adjustments()
            .list(&AdjustmentFilter {
                product_id: Some(product.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].adjustment_qty, 100);
        assert_eq!(history[0].reason, INITIAL_STOCK_REASON);
        assert_eq!(history[0].adjusted_by, None);
    }

    #[tokio::test]
    async fn test_create_without_stock_logs_nothing() {
        let db = memory_db().await;

        let product = db.products().create(&draft("Aspirin 325mg", 0)).await.unwrap();

        let history = db
            .adjustments()
            .list(&AdjustmentFilter {
                product_id: Some(product.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let db = memory_db().await;
        let products = db.products();

        let err = products.create(&draft("   ", 10)).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));

        let mut negative_price = draft("Naproxen 250mg", 10);
        negative_price.price = Money::from_cents(-1);
        let err = products.create(&negative_price).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));

        let mut negative_qty = draft("Naproxen 250mg", 10);
        negative_qty.quantity = -1;
        assert!(products.create(&negative_qty).await.is_err());
    }

    #[tokio::test]
    async fn test_update_quantity_change_logs_edit_adjustment() {
        let db = memory_db().await;
        let product = db.products().create(&draft("Cetirizine 10mg", 80)).await.unwrap();

        let mut edited = draft("Cetirizine 10mg", 95);
        edited.supplier = Some("Supplier F".to_string());
        db.products().update(product.id, &edited, Some(7)).await.unwrap();

        let reloaded = db.products().get_required(product.id).await.unwrap();
        assert_eq!(reloaded.quantity, 95);
        assert_eq!(reloaded.supplier.as_deref(), Some("Supplier F"));

        let history = db
            .adjustments()
            .list(&AdjustmentFilter {
                product_id: Some(product.id),
                ..Default::default()
            })
            .await
            .unwrap();
        // Newest first: the edit delta on top of the initial entry.
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].adjustment_qty, 15);
        assert_eq!(history[0].reason, edit_adjustment_reason(95));
        assert_eq!(history[0].adjusted_by, Some(7));
    }

    #[tokio::test]
    async fn test_update_without_quantity_change_logs_nothing() {
        let db = memory_db().await;
        let product = db.products().create(&draft("Loratadine 10mg", 50)).await.unwrap();

        let mut edited = draft("Loratadine 10mg (repack)", 50);
        edited.price = Money::from_cents(649);
        db.products().update(product.id, &edited, Some(7)).await.unwrap();

        let history = db
            .adjustments()
            .list(&AdjustmentFilter {
                product_id: Some(product.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(history.len(), 1); // just the initial entry
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let db = memory_db().await;
        let err = db
            .products()
            .update(999, &draft("Ghost", 1), None)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::ProductNotFound(999))));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_sale_history() {
        let db = memory_db().await;
        let product = db.products().create(&draft("Omeprazole 20mg", 60)).await.unwrap();

        let lines = vec![SaleLineInput {
            product_id: product.id,
            qty: 2,
            unit_price: product.price(),
            unit_cost: product.cost(),
            discount: Money::zero(),
        }];
        db.sales().record_sale("INV-X", &lines, None).await.unwrap();

        let err = db.products().delete(product.id).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::ProductHasSales { sale_rows: 1, .. })
        ));

        // Still present.
        assert!(db.products().get(product.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_cascades_adjustments() {
        let db = memory_db().await;
        let product = db.products().create(&draft("Loperamide 2mg", 80)).await.unwrap();
        db.adjustments()
            .adjust(product.id, -5, "Damaged in transit", Some(3))
            .await
            .unwrap();

        db.products().delete(product.id).await.unwrap();

        assert!(db.products().get(product.id).await.unwrap().is_none());
        let history = db
            .adjustments()
            .list(&AdjustmentFilter {
                product_id: Some(product.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_product() {
        let db = memory_db().await;
        let err = db.products().delete(12345).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::ProductNotFound(12345))
        ));
    }

    #[tokio::test]
    async fn test_list_sorted_by_name_and_low_stock() {
        let db = memory_db().await;
        let products = db.products();

        products.create(&draft("Zinc Lozenges", 100)).await.unwrap();
        let mut low = draft("Amoxicillin 500mg", 5);
        low.reorder_level = 10;
        products.create(&low).await.unwrap();

        let all = products.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Amoxicillin 500mg");
        assert_eq!(all[1].name, "Zinc Lozenges");

        let low_stock = products.list_low_stock().await.unwrap();
        assert_eq!(low_stock.len(), 1);
        assert_eq!(low_stock[0].name, "Amoxicillin 500mg");
        assert!(low_stock[0].is_low_stock());
    }
}

//! # Sale Repository
//!
//! Commits sale batches against stock, reverses them, sequences invoice
//! identifiers, and serves sale history.
//!
//! ## Commit Flow
//! ```text
//! record_sale(invoice, lines, actor)
//!    │   (acquire write lock, begin tx)
//!    ├── for each line, in caller order:
//!    │     ├── qty <= 0?            → NonPositiveQuantity
//!    │     ├── line total < 0?      → NegativeLineTotal
//!    │     ├── SELECT quantity      → ProductNotFound
//!    │     │     (sees decrements from earlier lines of THIS batch)
//!    │     ├── qty > available?     → InsufficientStock
//!    │     ├── INSERT sales row
//!    │     └── UPDATE products SET quantity = quantity − qty
//!    └── commit — any failure rolls back every line
//! ```
//!
//! A reversal is the mirror image: restore each line's quantity, then
//! delete the invoice's rows, in one transaction. After it, the invoice is
//! unknown; a second reversal reports InvoiceNotFound.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::DbResult;
use apotheca_core::{invoice, validation, CoreError, Money, SaleFilter, SaleLineInput, SaleLineRecord};

/// Repository for the sale ledger.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, write_lock: Arc<Mutex<()>>) -> Self {
        SaleRepository { pool, write_lock }
    }

    /// Commits a sale batch atomically and returns the receipt total (the
    /// sum of per-line totals, each already rounded to the cent).
    ///
    /// Lines validate in order, and each line's stock check sees the
    /// decrements of earlier lines in the same batch, so two lines of the
    /// same product compete for the same stock. Any failure leaves the
    /// ledger and every product quantity untouched.
    pub async fn record_sale(
        &self,
        invoice: &str,
        lines: &[SaleLineInput],
        sold_by: Option<i64>,
    ) -> DbResult<Money> {
        validation::validate_invoice(invoice).map_err(CoreError::from)?;
        if lines.is_empty() {
            return Err(CoreError::EmptySale.into());
        }

        debug!(invoice, line_count = lines.len(), "Recording sale");

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let mut receipt_total = Money::zero();

        for line in lines {
            if line.qty <= 0 {
                return Err(CoreError::NonPositiveQuantity {
                    product_id: line.product_id,
                }
                .into());
            }

            let line_total = line.line_total();
            if line_total.is_negative() {
                return Err(CoreError::NegativeLineTotal {
                    product_id: line.product_id,
                }
                .into());
            }

            let available: Option<i64> =
                sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1")
                    .bind(line.product_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let available = available.ok_or(CoreError::ProductNotFound(line.product_id))?;

            if line.qty > available {
                return Err(CoreError::InsufficientStock {
                    product_id: line.product_id,
                    available,
                    requested: line.qty,
                }
                .into());
            }

            sqlx::query(
                r#"
                INSERT INTO sales (
                    invoice, product_id, qty, unit_price_mils, unit_cost_mils,
                    discount_mils, total_mils, sold_by, sold_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(invoice)
            .bind(line.product_id)
            .bind(line.qty)
            .bind(line.unit_price.mils())
            .bind(line.unit_cost.mils())
            .bind(line.discount_per_unit().mils())
            .bind(line_total.mils())
            .bind(sold_by)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE products SET quantity = quantity - ?2 WHERE id = ?1")
                .bind(line.product_id)
                .bind(line.qty)
                .execute(&mut *tx)
                .await?;

            receipt_total += line_total;
        }

        tx.commit().await?;

        info!(invoice, total = %receipt_total, "Sale committed");

        Ok(receipt_total)
    }

    /// Reverses a committed sale: restores every line's quantity to its
    /// product, then deletes the invoice's rows. All or nothing.
    ///
    /// A missing product under one of the lines aborts the whole reversal;
    /// restoring the other lines while silently dropping that one would
    /// leave the ledger claiming stock that never came back.
    ///
    /// The actor is logged but not persisted: the reversal removes the
    /// invoice's rows, so there is nothing left to attribute.
    pub async fn undo_sale(&self, invoice: &str, undone_by: Option<i64>) -> DbResult<()> {
        validation::validate_invoice(invoice).map_err(CoreError::from)?;

        debug!(invoice, undone_by, "Reversing sale");

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let lines: Vec<(i64, i64)> =
            sqlx::query_as("SELECT product_id, qty FROM sales WHERE invoice = ?1")
                .bind(invoice)
                .fetch_all(&mut *tx)
                .await?;

        if lines.is_empty() {
            return Err(CoreError::InvoiceNotFound(invoice.to_string()).into());
        }

        for (product_id, qty) in &lines {
            let result = sqlx::query("UPDATE products SET quantity = quantity + ?2 WHERE id = ?1")
                .bind(product_id)
                .bind(qty)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(CoreError::ReversalTargetMissing {
                    invoice: invoice.to_string(),
                    product_id: *product_id,
                }
                .into());
            }
        }

        sqlx::query("DELETE FROM sales WHERE invoice = ?1")
            .bind(invoice)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(invoice, line_count = lines.len(), "Sale reversed");

        Ok(())
    }

    /// Suggests the next invoice identifier for the given calendar day:
    /// `INV-YYMMDD-NNN` where NNN is the count of distinct invoices already
    /// recorded that day, plus one.
    ///
    /// Advisory only. Nothing is reserved; the caller may override the
    /// suggestion, and a reversal can make the same suggestion reappear.
    pub async fn next_invoice_id(&self, as_of: NaiveDate) -> DbResult<String> {
        let prefix = invoice::day_prefix(as_of);

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT invoice) FROM sales WHERE invoice LIKE ?1",
        )
        .bind(format!("{prefix}%"))
        .fetch_one(&self.pool)
        .await?;

        Ok(invoice::format_invoice(as_of, existing + 1))
    }

    /// Sale history, newest first. All filters are optional and combine
    /// with AND; date bounds are inclusive calendar days.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<SaleLineRecord>> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT id, invoice, product_id, qty, unit_price_mils, unit_cost_mils, \
             discount_mils, total_mils, sold_by, sold_at \
             FROM sales WHERE 1=1",
        );

        if let Some(from) = filter.date_from {
            query.push(" AND date(sold_at) >= date(").push_bind(from).push(")");
        }
        if let Some(to) = filter.date_to {
            query.push(" AND date(sold_at) <= date(").push_bind(to).push(")");
        }
        if let Some(product_id) = filter.product_id {
            query.push(" AND product_id = ").push_bind(product_id);
        }
        if let Some(ref inv) = filter.invoice {
            query.push(" AND invoice = ").push_bind(inv.clone());
        }

        query.push(" ORDER BY sold_at DESC, id DESC");

        let records = query
            .build_query_as::<SaleLineRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{draft, file_db, memory_db};
    use crate::DbError;
    use apotheca_core::AdjustmentFilter;

    fn cash_line(product_id: i64, qty: i64, price_cents: i64) -> SaleLineInput {
        SaleLineInput {
            product_id,
            qty,
            unit_price: Money::from_cents(price_cents),
            unit_cost: Money::from_cents(price_cents / 2),
            discount: Money::zero(),
        }
    }

    #[tokio::test]
    async fn test_record_sale_decrements_stock_and_totals_per_line() {
        let db = memory_db().await;
        let product = db.products().create(&draft("Ibuprofen 200mg", 50)).await.unwrap();

        // 3 × $5.995 rounds per line: $17.985 → $17.99.
        let lines = vec![SaleLineInput {
            product_id: product.id,
            qty: 3,
            unit_price: Money::from_mils(5_995),
            unit_cost: Money::from_cents(350),
            discount: Money::zero(),
        }];
        let total = db.sales().record_sale("INV-A", &lines, Some(2)).await.unwrap();
        assert_eq!(total, Money::from_cents(1_799));

        assert_eq!(db.products().get_required(product.id).await.unwrap().quantity, 47);

        let rows = db
            .sales()
            .list(&SaleFilter {
                invoice: Some("INV-A".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total(), Money::from_cents(1_799));
        assert_eq!(rows[0].sold_by, Some(2));
    }

    #[tokio::test]
    async fn test_record_sale_is_all_or_nothing() {
        let db = memory_db().await;
        let plenty = db.products().create(&draft("Bandages", 100)).await.unwrap();
        let scarce = db.products().create(&draft("Thermometer", 1)).await.unwrap();

        let lines = vec![
            cash_line(plenty.id, 5, 299),
            cash_line(scarce.id, 2, 1_999), // more than on hand
        ];
        let err = db.sales().record_sale("INV-B", &lines, None).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::InsufficientStock {
                available: 1,
                requested: 2,
                ..
            })
        ));

        // First line rolled back too.
        assert_eq!(db.products().get_required(plenty.id).await.unwrap().quantity, 100);
        assert_eq!(db.products().get_required(scarce.id).await.unwrap().quantity, 1);
        assert!(db.sales().list(&SaleFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_product_lines_compete_for_stock() {
        let db = memory_db().await;
        let product = db.products().create(&draft("Cough Syrup", 10)).await.unwrap();

        let lines = vec![
            cash_line(product.id, 6, 799),
            cash_line(product.id, 6, 799), // only 4 left after line one
        ];
        let err = db.sales().record_sale("INV-C", &lines, None).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::InsufficientStock {
                available: 4,
                requested: 6,
                ..
            })
        ));
        assert_eq!(db.products().get_required(product.id).await.unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_record_sale_rejects_bad_lines() {
        let db = memory_db().await;
        let product = db.products().create(&draft("Eye Drops", 20)).await.unwrap();
        let sales = db.sales();

        let err = sales.record_sale("INV-D", &[], None).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::EmptySale)));

        let err = sales
            .record_sale("INV-D", &[cash_line(product.id, 0, 599)], None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::NonPositiveQuantity { .. })
        ));

        // Discount above the unit price is allowed only while the line
        // total stays non-negative.
        let negative = SaleLineInput {
            product_id: product.id,
            qty: 1,
            unit_price: Money::from_cents(500),
            unit_cost: Money::from_cents(300),
            discount: Money::from_cents(600),
        };
        let err = sales.record_sale("INV-D", &[negative], None).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::NegativeLineTotal { .. })
        ));

        let err = sales
            .record_sale("INV-D", &[cash_line(999, 1, 599)], None)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::ProductNotFound(999))));

        let err = sales
            .record_sale("   ", &[cash_line(product.id, 1, 599)], None)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_undo_restores_stock_and_second_undo_fails() {
        let db = memory_db().await;
        let first = db.products().create(&draft("Antacid Tablets", 30)).await.unwrap();
        let second = db.products().create(&draft("Lip Balm", 12)).await.unwrap();

        let lines = vec![cash_line(first.id, 4, 449), cash_line(second.id, 2, 199)];
        db.sales().record_sale("INV-E", &lines, None).await.unwrap();
        assert_eq!(db.products().get_required(first.id).await.unwrap().quantity, 26);

        db.sales().undo_sale("INV-E", Some(2)).await.unwrap();
        assert_eq!(db.products().get_required(first.id).await.unwrap().quantity, 30);
        assert_eq!(db.products().get_required(second.id).await.unwrap().quantity, 12);
        assert!(db
            .sales()
            .list(&SaleFilter {
                invoice: Some("INV-E".to_string()),
                ..Default::default()
            })
            .await
            .unwrap()
            .is_empty());

        let err = db.sales().undo_sale("INV-E", Some(2)).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::InvoiceNotFound(_))));
    }

    #[tokio::test]
    async fn test_undo_aborts_when_a_line_product_is_gone() {
        let db = memory_db().await;
        let kept = db.products().create(&draft("Multivitamin", 25)).await.unwrap();
        let doomed = db.products().create(&draft("Probiotic", 8)).await.unwrap();

        let lines = vec![cash_line(kept.id, 3, 1_299), cash_line(doomed.id, 1, 2_499)];
        db.sales().record_sale("INV-F", &lines, None).await.unwrap();

        // Normal paths cannot delete a product with sale history; force the
        // broken state directly to exercise the reversal guard.
        let mut conn = db.pool().acquire().await.unwrap();
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(doomed.id)
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await
            .unwrap();
        drop(conn);

        let err = db.sales().undo_sale("INV-F", None).await.unwrap_err();
        match err.as_domain() {
            Some(CoreError::ReversalTargetMissing { product_id, .. }) => {
                assert_eq!(*product_id, doomed.id);
            }
            other => panic!("expected ReversalTargetMissing, got {other:?}"),
        }

        // Nothing restored, nothing deleted.
        assert_eq!(db.products().get_required(kept.id).await.unwrap().quantity, 22);
        assert_eq!(
            db.sales()
                .list(&SaleFilter {
                    invoice: Some("INV-F".to_string()),
                    ..Default::default()
                })
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_invoice_sequence_counts_distinct_invoices() {
        let db = memory_db().await;
        let product = db.products().create(&draft("Cotton Swabs", 100)).await.unwrap();
        let sales = db.sales();
        let today = Utc::now().date_naive();

        let first = sales.next_invoice_id(today).await.unwrap();
        assert_eq!(first, invoice::format_invoice(today, 1));

        // A two-line sale shares one invoice and bumps the sequence once.
        let lines = vec![cash_line(product.id, 1, 99), cash_line(product.id, 2, 99)];
        sales.record_sale(&first, &lines, None).await.unwrap();

        let second = sales.next_invoice_id(today).await.unwrap();
        assert_eq!(second, invoice::format_invoice(today, 2));

        sales
            .record_sale(&second, &[cash_line(product.id, 1, 99)], None)
            .await
            .unwrap();
        assert_eq!(
            sales.next_invoice_id(today).await.unwrap(),
            invoice::format_invoice(today, 3)
        );
    }

    #[tokio::test]
    async fn test_concurrent_last_unit_has_one_winner() {
        let db = file_db("last-unit").await;
        let product = db.products().create(&draft("Epinephrine Pen", 1)).await.unwrap();

        let task = |db: crate::Database, invoice: &'static str| {
            let product_id = product.id;
            tokio::spawn(async move {
                db.sales()
                    .record_sale(invoice, &[cash_line(product_id, 1, 9_999)], None)
                    .await
            })
        };
        let (left, right) = tokio::join!(task(db.clone(), "INV-L"), task(db.clone(), "INV-R"));
        let outcomes: Vec<Result<Money, DbError>> = vec![left.unwrap(), right.unwrap()];

        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        let loser = outcomes.iter().find(|r| r.is_err()).unwrap();
        assert!(matches!(
            loser.as_ref().unwrap_err().as_domain(),
            Some(CoreError::InsufficientStock {
                available: 0,
                requested: 1,
                ..
            })
        ));

        assert_eq!(db.products().get_required(product.id).await.unwrap().quantity, 0);
        assert_eq!(db.sales().list(&SaleFilter::default()).await.unwrap().len(), 1);

        db.close().await;
    }

    #[tokio::test]
    async fn test_quantity_matches_ledger_sums() {
        let db = memory_db().await;
        let product = db.products().create(&draft("Insulin Pen Needles", 60)).await.unwrap();

        db.adjustments().adjust(product.id, 15, "Restock", None).await.unwrap();
        db.sales()
            .record_sale("INV-G", &[cash_line(product.id, 9, 1_499)], None)
            .await
            .unwrap();
        db.sales()
            .record_sale("INV-H", &[cash_line(product.id, 5, 1_499)], None)
            .await
            .unwrap();
        db.sales().undo_sale("INV-H", None).await.unwrap();

        let adjusted: i64 = db
            .adjustments()
            .list(&AdjustmentFilter {
                product_id: Some(product.id),
                ..Default::default()
            })
            .await
            .unwrap()
            .iter()
            .map(|a| a.adjustment_qty)
            .sum();
        let sold: i64 = db
            .sales()
            .list(&SaleFilter {
                product_id: Some(product.id),
                ..Default::default()
            })
            .await
            .unwrap()
            .iter()
            .map(|s| s.qty)
            .sum();

        let quantity = db.products().get_required(product.id).await.unwrap().quantity;
        assert_eq!(quantity, adjusted - sold);
        assert_eq!(quantity, 66);
    }
}

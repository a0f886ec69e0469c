//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Commit Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    commit_sale() - one SQLite transaction               │
//! │                                                                         │
//! │  0. request.validate()           rejected before BEGIN                  │
//! │                                                                         │
//! │  BEGIN IMMEDIATE                 write lock taken up front, waits up to │
//! │                                  busy_timeout behind another commit     │
//! │  1. resolve customer             insert-or-ignore by email, then select │
//! │  2. load products, resolve_lines cumulative stock check, list order     │
//! │  3. conditional decrements       UPDATE .. WHERE stock >= ?q            │
//! │                                  ascending product id, 0 rows = Conflict│
//! │  4. check_total                  Trust: warn / Enforce: reject          │
//! │  5. INSERT sales + sale_items    name and price snapshots               │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: no sale, no stock       │
//! │  change, no new customer.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Local, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::customer::{fetch_by_id as fetch_customer, upsert_by_email};
use crate::repository::generate_id;
use tally_core::sale::{check_total, plan_decrements, resolve_lines, TotalCheck};
use tally_core::validation::validate_sale_edit;
use tally_core::{
    CoreError, CustomerRef, DateRange, LineItem, NewSale, Product, Sale, SaleDetail, SaleEdit,
    TotalPolicy,
};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    customer_id: String,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    total_amount_cents: i64,
    date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl SaleRow {
    fn into_sale(self, items: Vec<LineItem>) -> Sale {
        Sale {
            id: self.id,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            items,
            total_amount_cents: self.total_amount_cents,
            date: self.date,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleItemRow {
    sale_id: String,
    product_id: String,
    product_name: String,
    unit_price_cents: i64,
    quantity: i64,
}

impl From<SaleItemRow> for LineItem {
    fn from(row: SaleItemRow) -> Self {
        LineItem {
            product_id: row.product_id,
            product_name: row.product_name,
            unit_price_cents: row.unit_price_cents,
            quantity: row.quantity,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a sale atomically.
    ///
    /// ## Errors
    /// - `Domain(Validation)` - empty cart, bad quantity, bad customer fields
    /// - `Domain(CustomerNotFound)` - `CustomerRef::Existing` id is unknown
    /// - `Domain(ProductNotFound)` - a line references a missing product
    /// - `Domain(InsufficientStock)` - first line whose cumulative quantity exceeds stock
    /// - `Domain(Conflict)` - a concurrent writer changed stock mid-commit, or
    ///   held the write lock past the busy timeout
    /// - `Domain(TotalMismatch)` - only under [`TotalPolicy::Enforce`]
    /// - `PoolExhausted` / `TransactionFailed` - transient, safe to retry
    pub async fn commit_sale(&self, request: &NewSale, policy: TotalPolicy) -> DbResult<SaleDetail> {
        request.validate()?;

        match self.commit_in_transaction(request, policy).await {
            Ok(detail) => {
                info!(
                    sale_id = %detail.sale.id,
                    customer_id = %detail.sale.customer_id,
                    customer_created = detail.customer_created,
                    lines = detail.sale.items.len(),
                    total_amount_cents = detail.sale.total_amount_cents,
                    "Sale committed"
                );
                Ok(detail)
            }
            Err(err) => {
                warn!(error = %err, lines = request.items.len(), "Sale commit rolled back");
                Err(err)
            }
        }
    }

    async fn commit_in_transaction(&self, request: &NewSale, policy: TotalPolicy) -> DbResult<SaleDetail> {
        // A deferred BEGIN followed by a read would pin a snapshot that the
        // first UPDATE cannot upgrade once another commit has written.
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| lock_contention(DbError::from(e)))?;

        // 1. Customer.
        let (customer, customer_created) = match &request.customer {
            CustomerRef::Profile(profile) => upsert_by_email(&mut tx, &profile.normalized()).await?,
            CustomerRef::Existing { customer_id } => {
                let customer = fetch_customer(&mut tx, customer_id)
                    .await?
                    .ok_or_else(|| CoreError::CustomerNotFound(customer_id.clone()))?;
                (customer, false)
            }
        };

        // 2. Stock check against rows read inside the transaction.
        let products = load_products(&mut tx, &request.product_ids()).await?;
        let lines = resolve_lines(&request.items, &products)?;

        // 3. Conditional decrements.
        for decrement in plan_decrements(&request.items) {
            debug!(
                product_id = %decrement.product_id,
                quantity = decrement.quantity,
                "Decrementing stock"
            );

            let result = sqlx::query(
                r#"
                UPDATE products
                SET stock = stock - ?2, updated_at = ?3
                WHERE id = ?1 AND stock >= ?2
                "#,
            )
            .bind(&decrement.product_id)
            .bind(decrement.quantity)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(CoreError::Conflict(format!(
                    "stock for product {} changed during commit",
                    decrement.product_id
                ))
                .into());
            }
        }

        // 4. Total.
        if let TotalCheck::Mismatch { expected } =
            check_total(policy, request.total_amount_cents, &lines)?
        {
            warn!(
                submitted = request.total_amount_cents,
                expected,
                "Submitted total differs from resolved prices; keeping submitted total"
            );
        }

        // 5. Sale and lines.
        let now = Utc::now();
        let sale = Sale {
            id: generate_id(),
            customer_id: customer.id.clone(),
            customer_name: customer.name.clone(),
            customer_email: customer.email.clone(),
            customer_phone: customer.phone.clone(),
            items: lines,
            total_amount_cents: request.total_amount_cents,
            date: request.date.unwrap_or_else(|| Local::now().date_naive()),
            created_at: now,
        };

        insert_sale(&mut tx, &sale).await?;

        tx.commit()
            .await
            .map_err(|e| lock_contention(DbError::from(e)))?;

        Ok(SaleDetail {
            sale,
            customer: Some(customer),
            customer_created,
        })
    }

    /// Lists sales within an inclusive date range, newest first.
    ///
    /// `DateRange::default()` returns the full history.
    pub async fn list(&self, range: &DateRange) -> DbResult<Vec<Sale>> {
        debug!(from = ?range.from, to = ?range.to, "Listing sales");

        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, customer_id, customer_name, customer_email, customer_phone,
                   total_amount_cents, date, created_at
            FROM sales
            WHERE (?1 IS NULL OR date >= ?1)
              AND (?2 IS NULL OR date <= ?2)
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;

        let item_rows = sqlx::query_as::<_, SaleItemRow>(
            r#"
            SELECT si.sale_id, si.product_id, si.product_name, si.unit_price_cents, si.quantity
            FROM sale_items si
            INNER JOIN sales s ON s.id = si.sale_id
            WHERE (?1 IS NULL OR s.date >= ?1)
              AND (?2 IS NULL OR s.date <= ?2)
            ORDER BY si.sale_id, si.position
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<String, Vec<LineItem>> = HashMap::new();
        for row in item_rows {
            items.entry(row.sale_id.clone()).or_default().push(row.into());
        }

        let sales: Vec<Sale> = rows
            .into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_sale(lines)
            })
            .collect();

        debug!(count = sales.len(), "Listed sales");
        Ok(sales)
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let row = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, customer_id, customer_name, customer_email, customer_phone,
                   total_amount_cents, date, created_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = self.get_items(id).await?;
        Ok(Some(row.into_sale(items)))
    }

    /// Gets the line items of a sale in submission order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<LineItem>> {
        let rows = sqlx::query_as::<_, SaleItemRow>(
            r#"
            SELECT sale_id, product_id, product_name, unit_price_cents, quantity
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY position
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LineItem::from).collect())
    }

    /// Gets a sale together with its current customer record.
    pub async fn get_detail(&self, id: &str) -> DbResult<SaleDetail> {
        let sale = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))?;

        let mut conn = self.pool.acquire().await?;
        let customer = fetch_customer(&mut conn, &sale.customer_id).await?;

        Ok(SaleDetail {
            sale,
            customer,
            customer_created: false,
        })
    }

    /// Administrative correction of the customer snapshot, date or total.
    ///
    /// Line items and stock are never touched.
    pub async fn update_details(&self, id: &str, edit: &SaleEdit) -> DbResult<Sale> {
        validate_sale_edit(edit)?;

        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))?;

        let sale = edit.apply_to(&existing);

        debug!(id = %id, total_amount_cents = sale.total_amount_cents, date = %sale.date, "Editing sale");

        let result = sqlx::query(
            r#"
            UPDATE sales
            SET customer_name = ?2,
                customer_email = ?3,
                customer_phone = ?4,
                total_amount_cents = ?5,
                date = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&sale.customer_name)
        .bind(&sale.customer_email)
        .bind(&sale.customer_phone)
        .bind(sale.total_amount_cents)
        .bind(sale.date)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(sale)
    }

    /// Counts sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction helpers
// =============================================================================

async fn load_products(
    conn: &mut SqliteConnection,
    ids: &[String],
) -> DbResult<HashMap<String, Product>> {
    let mut products = HashMap::with_capacity(ids.len());

    for id in ids {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(product) = product {
            products.insert(product.id.clone(), product);
        }
    }

    Ok(products)
}

async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, lines = sale.items.len(), "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, customer_id, customer_name, customer_email, customer_phone,
            total_amount_cents, date, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.customer_id)
    .bind(&sale.customer_name)
    .bind(&sale.customer_email)
    .bind(&sale.customer_phone)
    .bind(sale.total_amount_cents)
    .bind(sale.date)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;

    for (position, item) in sale.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                sale_id, position, product_id, product_name, unit_price_cents, quantity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&sale.id)
        .bind(position as i64)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(item.unit_price_cents)
        .bind(item.quantity)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// BEGIN or COMMIT of a sale commit failed. Losing the write lock to another
/// commit is stock contention, so it surfaces as `Conflict`.
fn lock_contention(err: DbError) -> DbError {
    match err {
        DbError::Busy(msg) => CoreError::Conflict(format!("write lock unavailable: {msg}")).into(),
        DbError::PoolExhausted => DbError::PoolExhausted,
        other => DbError::TransactionFailed(other.to_string()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tally_core::{CustomerProfile, NewLineItem, NewProduct, ProductPatch};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn product(db: &Database, name: &str, price_cents: i64, stock: i64) -> Product {
        db.products()
            .insert(&NewProduct {
                name: name.to_string(),
                price_cents,
                stock,
            })
            .await
            .unwrap()
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    fn asha() -> CustomerRef {
        CustomerRef::Profile(CustomerProfile {
            name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: "+91 98765 43210".to_string(),
        })
    }

    fn line(product: &Product, quantity: i64) -> NewLineItem {
        NewLineItem {
            product_id: product.id.clone(),
            quantity,
        }
    }

    fn sale_request(customer: CustomerRef, items: Vec<NewLineItem>, total: i64) -> NewSale {
        NewSale {
            customer,
            items,
            total_amount_cents: total,
            date: NaiveDate::from_ymd_opt(2024, 1, 5),
        }
    }

    #[tokio::test]
    async fn test_commit_decrements_stock_cumulatively() {
        let db = db().await;
        let notebook = product(&db, "Notebook", 4500, 5).await;
        let pen = product(&db, "Pen", 1000, 10).await;

        let request = sale_request(
            asha(),
            vec![line(&notebook, 2), line(&pen, 4), line(&notebook, 1)],
            4500 * 3 + 1000 * 4,
        );
        let detail = db.sales().commit_sale(&request, TotalPolicy::Trust).await.unwrap();

        assert_eq!(stock_of(&db, &notebook.id).await, 2);
        assert_eq!(stock_of(&db, &pen.id).await, 6);

        assert!(detail.customer_created);
        assert_eq!(detail.sale.items.len(), 3);
        assert_eq!(detail.sale.items[0].product_name, "Notebook");
        assert_eq!(detail.sale.items[1].unit_price_cents, 1000);
        assert_eq!(detail.sale.customer_email, "asha@example.com");

        let stored = db.sales().get_by_id(&detail.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.items, detail.sale.items);
        assert_eq!(stored.total_amount_cents, 17500);
        assert_eq!(stored.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[tokio::test]
    async fn test_stock_equal_to_quantity_leaves_zero() {
        let db = db().await;
        let notebook = product(&db, "Notebook", 4500, 3).await;

        db.sales()
            .commit_sale(&sale_request(asha(), vec![line(&notebook, 3)], 13500), TotalPolicy::Trust)
            .await
            .unwrap();

        assert_eq!(stock_of(&db, &notebook.id).await, 0);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let db = db().await;
        let notebook = product(&db, "Notebook", 4500, 10).await;
        let pen = product(&db, "Pen", 1000, 1).await;

        let request = sale_request(asha(), vec![line(&notebook, 2), line(&pen, 2)], 11000);
        let err = db
            .sales()
            .commit_sale(&request, TotalPolicy::Trust)
            .await
            .unwrap_err();

        match err {
            DbError::Domain(CoreError::InsufficientStock {
                product,
                available,
                requested,
            }) => {
                assert_eq!(product, "Pen");
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(stock_of(&db, &notebook.id).await, 10);
        assert_eq!(stock_of(&db, &pen.id).await, 1);
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(db.customers().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_lines_fail_against_cumulative_stock() {
        let db = db().await;
        let notebook = product(&db, "Notebook", 4500, 4).await;

        let request = sale_request(asha(), vec![line(&notebook, 3), line(&notebook, 2)], 22500);
        let err = db
            .sales()
            .commit_sale(&request, TotalPolicy::Trust)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { requested: 5, .. })
        ));
        assert_eq!(stock_of(&db, &notebook.id).await, 4);
    }

    #[tokio::test]
    async fn test_missing_product_changes_nothing() {
        let db = db().await;
        let notebook = product(&db, "Notebook", 4500, 4).await;

        let request = sale_request(
            asha(),
            vec![
                line(&notebook, 1),
                NewLineItem {
                    product_id: "missing".to_string(),
                    quantity: 1,
                },
            ],
            4500,
        );
        let err = db
            .sales()
            .commit_sale(&request, TotalPolicy::Trust)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(id)) if id == "missing"));
        assert_eq!(stock_of(&db, &notebook.id).await, 4);
        assert_eq!(db.customers().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let db = db().await;
        let err = db
            .sales()
            .commit_sale(&sale_request(asha(), vec![], 0), TotalPolicy::Trust)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_existing_customer_is_reused() {
        let db = db().await;
        let notebook = product(&db, "Notebook", 4500, 10).await;

        let first = db
            .sales()
            .commit_sale(&sale_request(asha(), vec![line(&notebook, 1)], 4500), TotalPolicy::Trust)
            .await
            .unwrap();

        let resubmitted = CustomerRef::Profile(CustomerProfile {
            name: "Someone Else".to_string(),
            email: "ASHA@example.com".to_string(),
            phone: "555 0000".to_string(),
        });
        let second = db
            .sales()
            .commit_sale(&sale_request(resubmitted, vec![line(&notebook, 1)], 4500), TotalPolicy::Trust)
            .await
            .unwrap();

        assert!(!second.customer_created);
        assert_eq!(second.sale.customer_id, first.sale.customer_id);
        assert_eq!(second.sale.customer_name, "Asha Rao");
        assert_eq!(db.customers().count().await.unwrap(), 1);

        let by_id = CustomerRef::Existing {
            customer_id: first.sale.customer_id.clone(),
        };
        let third = db
            .sales()
            .commit_sale(&sale_request(by_id, vec![line(&notebook, 1)], 4500), TotalPolicy::Trust)
            .await
            .unwrap();
        assert_eq!(third.sale.customer_id, first.sale.customer_id);
    }

    #[tokio::test]
    async fn test_unknown_customer_id_is_not_found() {
        let db = db().await;
        let notebook = product(&db, "Notebook", 4500, 10).await;

        let request = sale_request(
            CustomerRef::Existing {
                customer_id: "nobody".to_string(),
            },
            vec![line(&notebook, 1)],
            4500,
        );
        let err = db
            .sales()
            .commit_sale(&request, TotalPolicy::Trust)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::CustomerNotFound(_))));
        assert_eq!(stock_of(&db, &notebook.id).await, 10);
    }

    #[tokio::test]
    async fn test_total_policy() {
        let db = db().await;
        let notebook = product(&db, "Notebook", 4500, 10).await;
        let request = sale_request(asha(), vec![line(&notebook, 2)], 5000);

        let err = db
            .sales()
            .commit_sale(&request, TotalPolicy::Enforce)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::TotalMismatch {
                submitted: 5000,
                expected: 9000
            })
        ));
        assert_eq!(stock_of(&db, &notebook.id).await, 10);
        assert_eq!(db.customers().count().await.unwrap(), 0);

        let trusted = db
            .sales()
            .commit_sale(&request, TotalPolicy::Trust)
            .await
            .unwrap();
        assert_eq!(trusted.sale.total_amount_cents, 5000);
        assert_eq!(stock_of(&db, &notebook.id).await, 8);
    }

    #[tokio::test]
    async fn test_concurrent_commits_never_oversell() {
        let db = db().await;
        let notebook = product(&db, "Notebook", 4500, 3).await;
        let request = sale_request(asha(), vec![line(&notebook, 2)], 9000);

        let first = {
            let repo = db.sales();
            let request = request.clone();
            tokio::spawn(async move { repo.commit_sale(&request, TotalPolicy::Trust).await })
        };
        let second = {
            let repo = db.sales();
            let request = request.clone();
            tokio::spawn(async move { repo.commit_sale(&request, TotalPolicy::Trust).await })
        };

        let results = vec![first.await.unwrap(), second.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        let failure = results.into_iter().find_map(Result::err).unwrap();
        assert!(matches!(
            failure,
            DbError::Domain(CoreError::InsufficientStock { .. }) | DbError::Domain(CoreError::Conflict(_))
        ));

        assert_eq!(stock_of(&db, &notebook.id).await, 1);
        assert_eq!(db.sales().count().await.unwrap(), 1);
    }

    /// Two commits race for the last units over a multi-connection pool on
    /// a real file, once per customer form.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_commits_on_file_pool_lose_with_stock_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("race.db")).max_connections(5))
            .await
            .unwrap();

        let (existing, _) = db
            .customers()
            .create_or_fetch(&CustomerProfile {
                name: "Ravi Menon".to_string(),
                email: "ravi@example.com".to_string(),
                phone: "555 0101".to_string(),
            })
            .await
            .unwrap();
        let by_id = CustomerRef::Existing {
            customer_id: existing.id.clone(),
        };

        for customer in [asha(), by_id] {
            for round in 0..10 {
                let notebook = product(&db, &format!("Notebook {round}"), 4500, 3).await;
                let request = sale_request(customer.clone(), vec![line(&notebook, 2)], 9000);

                let handles: Vec<_> = (0..2)
                    .map(|_| {
                        let repo = db.sales();
                        let request = request.clone();
                        tokio::spawn(async move { repo.commit_sale(&request, TotalPolicy::Trust).await })
                    })
                    .collect();

                let mut results = Vec::new();
                for handle in handles {
                    results.push(handle.await.unwrap());
                }

                assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
                let failure = results.into_iter().find_map(Result::err).unwrap();
                assert!(
                    matches!(
                        failure,
                        DbError::Domain(CoreError::InsufficientStock { .. })
                            | DbError::Domain(CoreError::Conflict(_))
                    ),
                    "{customer:?} round {round}: loser failed with {failure:?}"
                );
                assert_eq!(stock_of(&db, &notebook.id).await, 1);
            }
        }

        assert_eq!(db.sales().count().await.unwrap(), 20);
        db.close().await;
    }

    #[tokio::test]
    async fn test_write_lock_timeout_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(
            DbConfig::new(dir.path().join("locked.db"))
                .max_connections(2)
                .busy_timeout(std::time::Duration::from_millis(100)),
        )
        .await
        .unwrap();
        let notebook = product(&db, "Notebook", 4500, 3).await;

        let holder = db.pool().begin_with("BEGIN IMMEDIATE").await.unwrap();

        let err = db
            .sales()
            .commit_sale(&sale_request(asha(), vec![line(&notebook, 1)], 4500), TotalPolicy::Trust)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Conflict(_))), "got {err:?}");

        holder.rollback().await.unwrap();
        assert_eq!(stock_of(&db, &notebook.id).await, 3);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_snapshots_survive_product_edits() {
        let db = db().await;
        let notebook = product(&db, "Notebook", 4500, 10).await;

        let detail = db
            .sales()
            .commit_sale(&sale_request(asha(), vec![line(&notebook, 1)], 4500), TotalPolicy::Trust)
            .await
            .unwrap();

        db.products()
            .update(
                &notebook.id,
                &ProductPatch {
                    name: Some("Notebook A4".to_string()),
                    price_cents: Some(6000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = db.sales().get_by_id(&detail.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.items[0].product_name, "Notebook");
        assert_eq!(stored.items[0].unit_price_cents, 4500);
    }

    #[tokio::test]
    async fn test_list_filters_by_inclusive_date_range() {
        let db = db().await;
        let notebook = product(&db, "Notebook", 100, 100).await;

        for (day, month) in [(5, 1), (20, 1), (10, 2)] {
            let mut request = sale_request(asha(), vec![line(&notebook, 1), line(&notebook, 2)], 300);
            request.date = NaiveDate::from_ymd_opt(2024, month, day);
            db.sales().commit_sale(&request, TotalPolicy::Trust).await.unwrap();
        }

        let all = db.sales().list(&DateRange::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].date, NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
        assert!(all.iter().all(|s| s.items.len() == 2 && s.items[1].quantity == 2));

        let january = db
            .sales()
            .list(&DateRange {
                from: NaiveDate::from_ymd_opt(2024, 1, 5),
                to: NaiveDate::from_ymd_opt(2024, 1, 20),
            })
            .await
            .unwrap();
        assert_eq!(january.len(), 2);
    }

    #[tokio::test]
    async fn test_update_details_keeps_items_and_stock() {
        let db = db().await;
        let notebook = product(&db, "Notebook", 4500, 10).await;
        let detail = db
            .sales()
            .commit_sale(&sale_request(asha(), vec![line(&notebook, 2)], 9000), TotalPolicy::Trust)
            .await
            .unwrap();

        let edited = db
            .sales()
            .update_details(
                &detail.sale.id,
                &SaleEdit {
                    customer_name: Some("Asha R.".to_string()),
                    total_amount_cents: Some(8500),
                    date: NaiveDate::from_ymd_opt(2024, 1, 6),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(edited.customer_name, "Asha R.");
        assert_eq!(edited.total_amount_cents, 8500);
        assert_eq!(edited.items, detail.sale.items);
        assert_eq!(stock_of(&db, &notebook.id).await, 8);

        let reloaded = db.sales().get_detail(&detail.sale.id).await.unwrap();
        assert_eq!(reloaded.sale, edited);
        assert_eq!(
            reloaded.customer.map(|c| c.name),
            Some("Asha Rao".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_detail_missing_sale() {
        let db = db().await;
        let err = db.sales().get_detail("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
